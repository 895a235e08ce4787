use super::*;

fn desc(w: u32, h: u32) -> FrameDesc {
    FrameDesc {
        width: w,
        height: h,
        format: PixelFormat::Rgba8Premul,
    }
}

#[test]
fn new_frame_is_transparent_and_sized() {
    let f = Frame::new(desc(3, 2));
    assert_eq!(f.data().len(), 24);
    assert!(f.is_transparent());
}

#[test]
fn from_rgba8_premul_rejects_wrong_length() {
    assert!(Frame::from_rgba8_premul(desc(2, 2), vec![0; 15]).is_err());
    assert!(Frame::from_rgba8_premul(desc(2, 2), vec![0; 16]).is_ok());
}

#[test]
fn fill_and_pixel_lookup() {
    let mut f = Frame::new(desc(2, 2));
    f.fill(Rgba8Premul::from_straight_rgba(255, 0, 0, 255));
    assert_eq!(f.pixel(1, 1), Some([255, 0, 0, 255]));
    assert_eq!(f.pixel(2, 0), None);
    assert!(!f.is_transparent());
}

#[test]
fn rendered_sentinel_is_distinguishable() {
    let r: Rendered = Frame::new(desc(1, 1)).into();
    assert!(!r.is_end_of_stream());
    assert!(r.into_frame().is_some());

    let eos = Rendered::EndOfStream;
    assert!(eos.is_end_of_stream());
    assert!(eos.into_frame().is_none());
}
