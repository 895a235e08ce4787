use super::*;
use crate::frame::buffer::PixelFormat;

fn desc(w: u32, h: u32) -> FrameDesc {
    FrameDesc {
        width: w,
        height: h,
        format: PixelFormat::Rgba8Premul,
    }
}

#[test]
fn pool_honors_bucket_cap() {
    let mut p = BufferPool::new(BufferPoolOpts {
        max_pool_bytes: 1 << 30,
        max_buffers_per_bucket: 1,
    });
    let d = desc(8, 8);

    let a = p.borrow(d);
    let b = p.borrow(d);
    p.release(d, a);
    p.release(d, b);

    let st = p.stats();
    assert_eq!(st.retained_buffers, 1);
    assert_eq!(st.dropped_on_release, 1);
}

#[test]
fn pool_honors_global_byte_cap() {
    let bytes_8x8 = desc(8, 8).byte_len();
    let mut p = BufferPool::new(BufferPoolOpts {
        max_pool_bytes: bytes_8x8,
        max_buffers_per_bucket: 8,
    });
    let d = desc(8, 8);

    let a = p.borrow(d);
    let b = p.borrow(d);
    p.release(d, a);
    p.release(d, b);

    let st = p.stats();
    assert_eq!(st.retained_bytes, bytes_8x8);
    assert_eq!(st.retained_buffers, 1);
    assert!(st.dropped_on_release >= 1);
}

#[test]
fn reused_buffers_come_back_zeroed() {
    let mut p = BufferPool::new(BufferPoolOpts::default());
    let d = desc(2, 2);
    let mut a = p.borrow(d);
    a.fill(7);
    p.release(d, a);

    let b = p.borrow(d);
    assert!(b.iter().all(|&v| v == 0));
    let st = p.stats();
    assert_eq!(st.alloc_buffers, 1);
    assert_eq!(st.reused_buffers, 1);
}

#[test]
fn release_drops_buffers_of_the_wrong_length() {
    let mut p = BufferPool::new(BufferPoolOpts::default());
    p.release(desc(2, 2), vec![0; 3]);
    assert_eq!(p.stats().retained_buffers, 0);
    assert_eq!(p.stats().dropped_on_release, 1);
}
