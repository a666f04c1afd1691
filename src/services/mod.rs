pub mod capture;
pub mod change_detector;
pub mod config;
pub mod fingerprint_matcher;
pub mod fingerprint_store;
pub mod frame_dump;
pub mod labels;
pub mod ocr;
pub mod orchestrator;
pub mod perception;
pub mod polling;
pub mod region_resolver;
pub mod text_matcher;
