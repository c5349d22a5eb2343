//! AstroMediaServer のスタック構成
//!
//! 選択内容 (`Selection`) からスタック計画 (`StackPlan`) を組み立て、
//! Compose ドキュメントとダッシュボード設定に変換し、ディスク上に配置します。

pub mod assembler;
pub mod catalog;
pub mod error;
pub mod layout;
pub mod model;
pub mod provisioner;
pub mod render;

pub use assembler::*;
pub use error::*;
pub use layout::*;
pub use model::*;
pub use provisioner::*;
pub use render::*;
