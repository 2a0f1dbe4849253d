//! Property-based tests for edge-core.
//!
//! # Properties Tested
//!
//! - Output size: every valid RGBA frame yields exactly `w * h * 3` bytes
//! - Uniform input: grayscale of `(v, v, v, v)` pixels has equal channels
//! - Threshold passthrough: any threshold pair is accepted, in either order
//! - Marshaling: wrap then unwrap reproduces the caller's bytes

#![cfg(test)]

use proptest::prelude::*;

use crate::bridge::EdgeBridge;
use crate::frame::{unwrap_to_buffer, wrap_as_image_view};

// =============================================================================
// Generators
// =============================================================================

/// Small frame dimensions plus a matching RGBA buffer
fn arb_rgba_frame() -> impl Strategy<Value = (i32, i32, Vec<u8>)> {
    (1i32..24, 1i32..24).prop_flat_map(|(w, h)| {
        let len = (w * h * 4) as usize;
        (Just(w), Just(h), prop::collection::vec(any::<u8>(), len))
    })
}

fn ready_bridge() -> EdgeBridge {
    let bridge: EdgeBridge = EdgeBridge::new();
    bridge.init();
    bridge
}

// =============================================================================
// Properties
// =============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn edge_detect_output_is_w_h_3((w, h, buf) in arb_rgba_frame()) {
        let bridge = ready_bridge();
        let out = bridge.process_edge_detect(&buf, w, h, 50, 150).unwrap();
        prop_assert_eq!(out.len(), (w * h * 3) as usize);
        prop_assert!(bridge.last_processing_time_millis() >= 0.0);
        prop_assert_eq!(bridge.last_frame_dimensions(), (w as u32, h as u32));
    }

    #[test]
    fn grayscale_output_is_w_h_3((w, h, buf) in arb_rgba_frame()) {
        let bridge = ready_bridge();
        let out = bridge.process_grayscale(&buf, w, h).unwrap();
        prop_assert_eq!(out.len(), (w * h * 3) as usize);
        prop_assert!(out.chunks_exact(3).all(|px| px[0] == px[1] && px[1] == px[2]));
    }

    #[test]
    fn uniform_grayscale_has_equal_channels(w in 1i32..16, h in 1i32..16, v in any::<u8>()) {
        let bridge = ready_bridge();
        let buf = vec![v; (w * h * 4) as usize];
        let out = bridge.process_grayscale(&buf, w, h).unwrap();
        let first = out[0];
        prop_assert!(out.iter().all(|&b| b == first));
    }

    #[test]
    fn any_threshold_pair_is_accepted(t1 in -500i32..500, t2 in -500i32..500) {
        let bridge = ready_bridge();
        let buf: Vec<u8> = (0..8 * 8 * 4).map(|i| (i * 7) as u8).collect();
        let result = bridge.try_process_edge_detect(&buf, 8, 8, t1, t2);
        prop_assert!(result.is_ok());
        let outcome = result.unwrap();
        prop_assert!(!outcome.is_degraded());
        let bytes = outcome.into_bytes();
        prop_assert_eq!(bytes.len(), 8 * 8 * 3);

        let swapped = bridge.process_edge_detect(&buf, 8, 8, t2, t1).unwrap();
        prop_assert_eq!(bytes, swapped);
    }

    #[test]
    fn wrap_unwrap_preserves_bytes((w, h, buf) in arb_rgba_frame()) {
        let view = wrap_as_image_view(&buf, w, h).unwrap();
        let out = unwrap_to_buffer(&view).unwrap();
        prop_assert_eq!(out.as_bytes(), &buf[..]);
    }

    #[test]
    fn short_buffers_are_rejected(w in 1i32..32, h in 1i32..32, short_by in 1usize..8) {
        let len = ((w * h * 4) as usize).saturating_sub(short_by);
        let buf = vec![0u8; len];
        prop_assert!(wrap_as_image_view(&buf, w, h).is_err());
    }
}
