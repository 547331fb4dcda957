#![allow(dead_code)]

pub mod bridge;
pub mod source;

pub use bridge::StubBridge;
pub use source::ScriptedSource;
