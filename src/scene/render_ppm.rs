use crate::error::Result;
use crate::renderer::Renderer;
use std::fmt::Write;

/// Draws one frame and returns it as a plain-text PPM. Windowed renderers
/// have nothing to read back and yield a header-only image.
pub fn render_ppm(renderer: &mut Renderer) -> Result<String> {
    let width = renderer.config.width;
    let height = renderer.config.height;
    renderer.draw()?;
    let data = renderer.read_pixels()?;
    let mut ret = String::new();
    // writing into a String cannot fail
    let _ = writeln!(ret, "P3");
    let _ = writeln!(ret, "{width} {height} 255");
    for px in data.chunks_exact(4) {
        let _ = write!(ret, "{} {} {} ", px[0], px[1], px[2]);
    }
    Ok(ret)
}
