// src/drivers/mod.rs
// 采集管线的底层组件: 解包, 降频, 显示窗口, 线程间交接, 数据源
pub mod buffer;
pub mod error;
pub mod handoff;
pub mod packet;
pub mod scheduler;
pub mod source;
// 公开导出常用类型, 方便外部调用
pub use buffer::DisplayBuffer;
pub use error::PipelineError;
pub use handoff::latest_slot;
pub use packet::PacketDecoder;
pub use scheduler::Downsampler;
pub use source::{available_ports, open_serial, SimulatedInstrument};
