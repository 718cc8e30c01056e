use std::fs;
use wgsl_bsp::geometry::Mesh;
use wgsl_bsp::render_ppm;
use wgsl_bsp::renderer::RenderOutput;
use wgsl_bsp::scene::bsp::BuildConfig;
use wgsl_bsp::scene::{Material, Scene, SceneBsp};

const TEST_WIDTH: u32 = 160;
const TEST_HEIGHT: u32 = 120;
const BACKGROUND: [u8; 3] = [13, 13, 20];

fn parse_ppm(ppm: &str) -> (u32, u32, Vec<[u8; 3]>) {
    let mut lines = ppm.lines();
    assert_eq!(lines.next(), Some("P3"));
    let header: Vec<u32> = lines
        .next()
        .unwrap()
        .split_whitespace()
        .map(|s| s.parse().unwrap())
        .collect();
    let values: Vec<u8> = lines
        .flat_map(|l| l.split_whitespace())
        .map(|s| s.parse().unwrap())
        .collect();
    let pixels = values.chunks_exact(3).map(|c| [c[0], c[1], c[2]]).collect();
    (header[0], header[1], pixels)
}

fn close_to(a: [u8; 3], b: [u8; 3]) -> bool {
    a.iter().zip(b.iter()).all(|(x, y)| x.abs_diff(*y) <= 2)
}

fn render(scene: &mut SceneBsp, name: &str) -> (u32, u32, Vec<[u8; 3]>) {
    scene.init();
    let ppm = render_ppm(&mut scene.renderer).expect("render failed");
    fs::create_dir_all("tests/output").ok();
    fs::write(format!("tests/output/{name}.ppm"), &ppm).ok();
    parse_ppm(&ppm)
}

// Needs a GPU adapter: cargo test -- --ignored
#[test]
#[ignore]
fn cube_is_centered() {
    let mut scene = pollster::block_on(SceneBsp::new_cube(RenderOutput::Headless(
        TEST_WIDTH,
        TEST_HEIGHT,
    )))
    .expect("failed to create scene");
    let (width, height, pixels) = render(&mut scene, "cube");
    assert_eq!((width, height), (TEST_WIDTH, TEST_HEIGHT));
    assert_eq!(pixels.len(), (width * height) as usize);
    let center = pixels[(height / 2 * width + width / 2) as usize];
    assert!(!close_to(center, BACKGROUND), "center pixel {center:?} is background");
    assert!(close_to(pixels[0], BACKGROUND), "corner pixel {:?}", pixels[0]);
}

#[test]
#[ignore]
fn emissive_material_is_visible() {
    let mesh = Mesh::load_obj(include_bytes!("../assets/cube.obj"))
        .unwrap()
        .with_material(Material::new(
            glam::Vec4::new(0.0, 0.0, 0.0, 1.0),
            glam::Vec4::new(1.0, 0.0, 0.0, 1.0),
        ));
    let mut scene = pollster::block_on(SceneBsp::new(
        RenderOutput::Headless(TEST_WIDTH, TEST_HEIGHT),
        mesh,
        &BuildConfig::default(),
    ))
    .expect("failed to create scene");
    let (width, height, pixels) = render(&mut scene, "emissive_cube");
    let [r, g, b] = pixels[(height / 2 * width + width / 2) as usize];
    assert!(r > 200 && g < 10 && b < 10, "got {:?}", [r, g, b]);
}

#[test]
#[ignore]
fn resize_keeps_rendering() {
    let mut scene = pollster::block_on(SceneBsp::new_cube(RenderOutput::Headless(
        TEST_WIDTH,
        TEST_HEIGHT,
    )))
    .expect("failed to create scene");
    scene.init();
    scene.resize(TEST_WIDTH, TEST_HEIGHT);
    scene.draw().expect("draw failed");
    let pixels = scene.renderer.read_pixels().expect("readback failed");
    assert_eq!(pixels.len(), (TEST_WIDTH * TEST_HEIGHT * 4) as usize);
}
