//! JNI bindings for `com.example.edgedetection.ImageProcessingJNI`

use jni::objects::{JByteArray, JClass, JString, ReleaseMode};
use jni::sys::{jbyteArray, jdouble, jint};
use jni::JNIEnv;
use tracing::error;

use crate::error::AndroidError;
use crate::processor::{self, bridge};

/// Initialize (or re-initialize) the processor
#[no_mangle]
pub extern "system" fn Java_com_example_edgedetection_ImageProcessingJNI_initProcessor(
    _env: JNIEnv,
    _class: JClass,
) {
    processor::init_processor();
}

/// Initialize the processor from a JSON config.
/// Throws `IllegalArgumentException` if the config does not parse.
#[no_mangle]
pub extern "system" fn Java_com_example_edgedetection_ImageProcessingJNI_initProcessorWithConfig(
    mut env: JNIEnv,
    _class: JClass,
    config_json: JString,
) {
    let result = || -> Result<(), AndroidError> {
        let config_str: String = env.get_string(&config_json)?.into();
        processor::init_processor_with_config(&config_str)
    }();

    if let Err(e) = result {
        let _ = env.throw_new("java/lang/IllegalArgumentException", e.to_string());
    }
}

/// Process frame with Canny edge detection.
/// Returns a BGR8 byte array, or null if the processor is not initialized.
#[no_mangle]
pub extern "system" fn Java_com_example_edgedetection_ImageProcessingJNI_processFrameCanny(
    mut env: JNIEnv,
    _class: JClass,
    input_data: JByteArray,
    width: jint,
    height: jint,
    threshold1: jint,
    threshold2: jint,
) -> jbyteArray {
    let result = || -> Result<Option<Vec<u8>>, AndroidError> {
        with_pinned_frame(&mut env, &input_data, |frame| {
            bridge().process_edge_detect(frame, width, height, threshold1, threshold2)
        })
    }();

    into_java_array(&mut env, "processFrameCanny", result)
}

/// Process frame with grayscale conversion.
/// Returns a BGR8 byte array, or null if the processor is not initialized.
#[no_mangle]
pub extern "system" fn Java_com_example_edgedetection_ImageProcessingJNI_processFrameGrayscale(
    mut env: JNIEnv,
    _class: JClass,
    input_data: JByteArray,
    width: jint,
    height: jint,
) -> jbyteArray {
    let result = || -> Result<Option<Vec<u8>>, AndroidError> {
        with_pinned_frame(&mut env, &input_data, |frame| {
            bridge().process_grayscale(frame, width, height)
        })
    }();

    into_java_array(&mut env, "processFrameGrayscale", result)
}

/// Milliseconds spent on the last frame, 0.0 if none
#[no_mangle]
pub extern "system" fn Java_com_example_edgedetection_ImageProcessingJNI_getLastProcessingTime(
    _env: JNIEnv,
    _class: JClass,
) -> jdouble {
    bridge().last_processing_time_millis()
}

#[no_mangle]
pub extern "system" fn Java_com_example_edgedetection_ImageProcessingJNI_getFrameWidth(
    _env: JNIEnv,
    _class: JClass,
) -> jint {
    bridge().last_frame_dimensions().0 as jint
}

#[no_mangle]
pub extern "system" fn Java_com_example_edgedetection_ImageProcessingJNI_getFrameHeight(
    _env: JNIEnv,
    _class: JClass,
) -> jint {
    bridge().last_frame_dimensions().1 as jint
}

/// Pin the Java array and lend its bytes to `f` without copying.
///
/// Released with `JNI_ABORT` semantics when the elements drop: the frame is
/// read-only, nothing is written back.
fn with_pinned_frame<T>(
    env: &mut JNIEnv,
    array: &JByteArray,
    f: impl FnOnce(&[u8]) -> T,
) -> Result<T, AndroidError> {
    // SAFETY: no other JNI call touches `array` while the elements are alive,
    // and they are released before this function returns.
    let elements = unsafe { env.get_array_elements(array, ReleaseMode::NoCopyBack)? };
    let signed: &[i8] = &elements;
    // SAFETY: i8 and u8 share size and alignment; the slice borrows `elements`.
    let frame = unsafe { std::slice::from_raw_parts(signed.as_ptr() as *const u8, signed.len()) };
    Ok(f(frame))
}

fn into_java_array(
    env: &mut JNIEnv,
    call: &str,
    result: Result<Option<Vec<u8>>, AndroidError>,
) -> jbyteArray {
    let bytes = match result {
        Ok(Some(bytes)) => bytes,
        Ok(None) => return std::ptr::null_mut(),
        Err(e) => {
            error!("Error in {}: {}", call, e);
            return std::ptr::null_mut();
        }
    };

    match env.byte_array_from_slice(&bytes) {
        Ok(array) => array.into_raw(),
        Err(e) => {
            error!("Error in {}: could not create output array: {}", call, e);
            std::ptr::null_mut()
        }
    }
}
