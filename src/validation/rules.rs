//! Static rule table for known daemon parameters

use std::collections::HashMap;
use std::sync::LazyLock;

use super::Rule;

/// Version of the rule table. Bump when a rule changes meaning.
pub const RULES_VERSION: u32 = 3;

const ON_OFF: Rule = Rule::Bool;

const RULES: &[(&str, Rule)] = &[
    // Device
    ("framerate", Rule::Int { min: 2, max: 100 }),
    ("width", Rule::IntMultiple { min: 8, max: 9999, multiple: 8 }),
    ("height", Rule::IntMultiple { min: 8, max: 9999, multiple: 8 }),
    ("rotate", Rule::IntSet(&[0, 90, 180, 270])),
    // libcamera controls
    ("libcam_brightness", Rule::Float { min: -1.0, max: 1.0 }),
    ("libcam_contrast", Rule::Float { min: 0.0, max: 32.0 }),
    ("libcam_iso", Rule::IntOrZero { min: 100, max: 6400 }),
    ("libcam_awb_enable", ON_OFF),
    ("libcam_awb_mode", Rule::Int { min: 0, max: 6 }),
    ("libcam_awb_locked", ON_OFF),
    ("libcam_colour_temp", Rule::IntOrZero { min: 2000, max: 10000 }),
    ("libcam_colour_gain_r", Rule::Float { min: 0.0, max: 8.0 }),
    ("libcam_colour_gain_b", Rule::Float { min: 0.0, max: 8.0 }),
    ("libcam_af_mode", Rule::Int { min: 0, max: 2 }),
    ("libcam_af_range", Rule::Int { min: 0, max: 2 }),
    ("libcam_af_speed", Rule::Int { min: 0, max: 1 }),
    ("libcam_lens_position", Rule::Float { min: 0.0, max: 15.0 }),
    ("libcam_buffer_count", Rule::Int { min: 2, max: 8 }),
    // Overlay
    ("text_scale", Rule::Int { min: 1, max: 10 }),
    // Streaming
    ("stream_quality", Rule::Int { min: 1, max: 100 }),
    ("stream_maxrate", Rule::Int { min: 1, max: 100 }),
    ("stream_preview_scale", Rule::Int { min: 1, max: 100 }),
    ("stream_motion", ON_OFF),
    ("stream_localhost", ON_OFF),
    // Motion detection
    ("threshold", Rule::Int { min: 1, max: i32::MAX as i64 }),
    ("threshold_maximum", Rule::Int { min: 0, max: i32::MAX as i64 }),
    ("noise_level", Rule::Int { min: 1, max: 255 }),
    ("lightswitch_percent", Rule::Int { min: 0, max: 100 }),
    ("smart_mask_speed", Rule::Int { min: 0, max: 10 }),
    ("locate_motion_mode", Rule::OneOf(&["off", "on", "preview", "both"])),
    ("emulate_motion", ON_OFF),
    // Event timing
    ("event_gap", Rule::Int { min: 0, max: i32::MAX as i64 }),
    ("pre_capture", Rule::Int { min: 0, max: 100 }),
    ("post_capture", Rule::Int { min: 0, max: 10000 }),
    ("minimum_motion_frames", Rule::Int { min: 1, max: 10000 }),
    // Pictures
    ("picture_output", Rule::OneOf(&["off", "on", "first", "best", "center"])),
    ("picture_output_motion", ON_OFF),
    ("picture_quality", Rule::Int { min: 1, max: 100 }),
    ("snapshot_interval", Rule::Int { min: 0, max: 86400 }),
    // Movies
    ("movie_output", ON_OFF),
    ("movie_output_motion", ON_OFF),
    ("movie_quality", Rule::Int { min: 1, max: 100 }),
    ("movie_max_time", Rule::Int { min: 0, max: 86400 }),
    ("movie_passthrough", ON_OFF),
    (
        "movie_container",
        Rule::OneOf(&["mkv", "mp4", "3gp", "webm", "hevc", "mp4:h264_v4l2m2m", "mkv:h264_v4l2m2m"]),
    ),
    (
        "movie_encoder_preset",
        Rule::OneOf(&[
            "ultrafast",
            "superfast",
            "veryfast",
            "faster",
            "fast",
            "medium",
            "slow",
            "slower",
            "veryslow",
        ]),
    ),
    // Storage
    ("target_dir", Rule::Text { non_empty: true }),
    // Schedule
    ("schedule_params", Rule::Schedule),
    // System
    ("daemon", ON_OFF),
    ("log_level", Rule::Int { min: 1, max: 9 }),
    ("webcontrol_port", Rule::Int { min: 0, max: 65535 }),
    ("webcontrol_auth_method", Rule::IntSet(&[0, 1, 2])),
    ("webcontrol_localhost", ON_OFF),
    ("webcontrol_tls", ON_OFF),
];

static TABLE: LazyLock<HashMap<&'static str, &'static Rule>> =
    LazyLock::new(|| RULES.iter().map(|(name, rule)| (*name, rule)).collect());

/// Look up the rule registered for a parameter name.
pub fn rule_for(name: &str) -> Option<&'static Rule> {
    TABLE.get(name).copied()
}

/// Names of every parameter with a registered rule.
pub fn known_parameters() -> impl Iterator<Item = &'static str> {
    RULES.iter().map(|(name, _)| *name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_has_no_duplicate_names() {
        assert_eq!(TABLE.len(), RULES.len());
    }

    #[test]
    fn lookups_hit_registered_names_only() {
        assert!(rule_for("stream_quality").is_some());
        assert!(rule_for("not_a_param").is_none());
        assert!(known_parameters().any(|n| n == "schedule_params"));
    }
}
