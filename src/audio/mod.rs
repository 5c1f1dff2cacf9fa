pub mod analyser;
pub mod bands;
pub mod graph;
pub mod playback;
pub mod sampler;
pub mod tap;

pub use analyser::Analyser;
pub use bands::{band_ranges, bands, detect_beat, BandLevels, FrequencySnapshot, DEFAULT_BEAT_THRESHOLD};
pub use graph::{
    AudioHost, AutoplayPolicy, ContextInfo, CpalHost, GraphConfig, GraphError, GraphState,
    SignalGraph, UserGesture,
};
pub use playback::{
    FetchMode, MediaBackend, MediaInfo, PlaybackElement, PlaybackError, PlaybackEvent,
    RodioBackend,
};
pub use sampler::{AnalysisFrame, FrameSampler};
pub use tap::{GainNode, SourceId, TapLink, TapPoint, TapSource};
