//! 信号引擎：分类器、去抖状态跟踪器、轮询编排器与命令服务。

pub mod classifier;
pub mod command;
pub mod runtime;
pub mod tracker;
