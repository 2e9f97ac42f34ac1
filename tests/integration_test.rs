use image::{DynamicImage, GenericImageView, Rgb, RgbImage, Rgba};
use snapedit::ops::save_image;
use snapedit::{Edit, EditError, Editor, Region, Session};
use std::path::{Path, PathBuf};

fn write_fixture(dir: &Path, name: &str, width: u32, height: u32) -> PathBuf {
    let img = RgbImage::from_fn(width, height, |x, y| {
        Rgb([(x * 2) as u8, (y * 2) as u8, ((x + y) % 256) as u8])
    });
    let path = dir.join(name);
    img.save(&path).unwrap();
    path
}

fn parse_all(edits: &[&str]) -> Vec<Edit> {
    edits.iter().map(|text| text.parse().unwrap()).collect()
}

#[test]
fn test_edit_script_from_disk_to_disk() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_fixture(dir.path(), "input.png", 100, 100);
    let output = dir.path().join("output.png");

    let mut session = Session::new();
    session.load(&input).unwrap();
    for edit in parse_all(&["crop=10,10,50,50", "rotate=0", "rect=0,0,20,10"]) {
        session.apply(&edit).unwrap();
    }
    save_image(session.current().unwrap(), &output).unwrap();

    let saved = image::open(&output).unwrap();
    assert_eq!(saved.dimensions(), (50, 50));
    assert_eq!(saved.get_pixel(0, 0), Rgba([0, 0, 255, 255]));
    assert_eq!(saved.get_pixel(20, 10), Rgba([0, 0, 255, 255]));
}

#[test]
fn test_reset_after_script_matches_file() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_fixture(dir.path(), "input.png", 64, 48);
    let on_disk = image::open(&input).unwrap();

    let mut session = Session::new();
    session.load(&input).unwrap();
    for edit in parse_all(&["channel=GREEN", "rotate=33", "crop=1,1,10,10", "rect=2,2,4,4", "reset"]) {
        session.apply(&edit).unwrap();
    }

    assert_eq!(session.current().unwrap().as_bytes(), on_disk.to_rgb8().as_raw().as_slice());
}

#[test]
fn test_failed_edit_in_script_keeps_last_good_image() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_fixture(dir.path(), "input.png", 100, 100);

    let mut session = Session::new();
    session.load(&input).unwrap();
    session.crop(Region::new(0, 0, 60, 60)).unwrap();

    let err = session.apply(&Edit::Crop(Region::new(10, 10, 200, 50))).unwrap_err();
    assert!(err.is_invalid_parameter());
    assert_eq!(session.current().unwrap().dimensions(), (60, 60));
    assert_eq!(session.generation(), 2);
}

#[test]
fn test_unreadable_file_is_reported() {
    let dir = tempfile::tempdir().unwrap();
    let bogus = dir.path().join("broken.png");
    std::fs::write(&bogus, b"definitely not a png").unwrap();

    let mut session = Session::new();
    match session.load(&bogus) {
        Err(EditError::Load { path, .. }) => assert_eq!(path, bogus),
        other => panic!("unexpected result: {:?}", other),
    }
    assert!(session.current().is_none());
}

#[test]
fn test_editor_from_a_non_async_caller() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_fixture(dir.path(), "input.png", 80, 60);
    let runtime = tokio::runtime::Runtime::new().unwrap();
    let editor = Editor::new(runtime.handle());

    let load = editor.load(&input);
    let crop = editor.crop(Region::new(0, 0, 40, 30));
    let channel = editor.extract_channel("blue");

    let frame = runtime.block_on(async {
        load.wait().await.unwrap();
        crop.wait().await.unwrap();
        channel.wait().await
    });
    let frame = frame.unwrap();

    assert_eq!(frame.generation, 3);
    assert_eq!(frame.image.dimensions(), (40, 30));
    let expected = image::open(&input).unwrap().to_rgb8().get_pixel(7, 5)[2];
    assert_eq!(frame.image.as_luma8().unwrap().get_pixel(7, 5)[0], expected);
}

#[test]
fn test_gray_image_rejects_second_channel_extraction() {
    let mut session = Session::new();
    session
        .capture(&mut || -> Result<DynamicImage, EditError> { Ok(DynamicImage::new_rgb8(10, 10)) })
        .unwrap();
    session.extract_channel("red").unwrap();

    let err = session.extract_channel("green").unwrap_err();
    assert!(matches!(err, EditError::ChannelUnavailable { channels: 1, .. }));
    // Drawing on the extracted plane still works.
    session.draw_rectangle(Region::new(0, 0, 3, 3)).unwrap();
    assert_eq!(session.current().unwrap().as_luma8().unwrap().get_pixel(0, 0)[0], 255);
}
