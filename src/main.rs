use std::env;
use wgsl_bsp::App;
use winit::event_loop::{ControlFlow, EventLoop};

fn main() {
    env_logger::init();
    let args: Vec<String> = env::args().collect();
    let event_loop = match EventLoop::new() {
        Ok(event_loop) => event_loop,
        Err(e) => {
            log::error!("failed to create event loop: {e}");
            std::process::exit(1);
        }
    };
    event_loop.set_control_flow(ControlFlow::Wait);
    let mut app = App::default();
    app.parse_args(args);
    if let Err(e) = event_loop.run_app(&mut app) {
        log::error!("event loop terminated: {e}");
        std::process::exit(1);
    }
}
