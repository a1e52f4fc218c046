pub(super) fn default_epochs() -> usize {
    100
}

pub(super) fn default_batch_size() -> usize {
    32
}

pub(super) fn default_learning_rate() -> f32 {
    0.001
}

pub(super) fn default_validation_fraction() -> f32 {
    0.2
}

pub(super) fn default_seed() -> u64 {
    42
}

pub(super) fn default_filters() -> usize {
    16
}

pub(super) fn default_kernel_size() -> usize {
    8
}

pub(super) fn default_pool_size() -> usize {
    8
}

pub(super) fn default_live_capture_filename() -> String {
    "recording.wav".to_string()
}

pub(super) fn default_request_timeout_ms() -> u64 {
    30_000
}
