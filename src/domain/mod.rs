// Domain layer: core models and ports (interfaces) for speech synthesis and transcription.

pub mod model;
pub mod ports;
