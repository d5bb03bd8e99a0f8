//! TypeScript Generation Tests
//!
//! Validates that motionctl types can be exported to TypeScript when the
//! tauri feature is enabled.

#[cfg(feature = "tauri")]
#[test]
fn test_core_types_implement_specta_type() {
    use specta::Type;

    // If this compiles, the types are configured for TypeScript export.
    fn assert_type<T: Type>() {}

    assert_type::<motionctl::ParamType>();
    assert_type::<motionctl::ApplyState>();
    assert_type::<motionctl::Severity>();
    assert_type::<motionctl::backends::Role>();
}

#[cfg(not(feature = "tauri"))]
#[test]
fn test_tauri_feature_disabled() {
    // Types still compile without specta::Type
    let _ = motionctl::ApplyState::Idle;
    let _ = motionctl::ParamType::Boolean;
}
