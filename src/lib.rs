//! # cactus-project
//!
//! Progressive Cactus 比对流水线的工作目录准备工具。
//!
//! 本 crate 不做比对本身，只负责启动前的准备：
//!
//! - **配置合并**：读取默认或用户指定的工作流配置模板，应用命令行覆盖项
//!   （HAL / FASTA / MAF 输出、legacy 模式下关闭渐进式分解）
//! - **实验描述**：由 seqfile 生成输入序列描述，并附加键值数据库连接参数
//! - **交接**：把 `config.xml` 与 `expTemplate.xml` 写入工作目录，
//!   重建 `progressiveAlignment/`，调用 `cactus_createMultiCactusProject`
//!
//! ## 快速示例
//!
//! ```rust,no_run
//! use std::path::Path;
//! use cactus_project::io::seqfile::SeqFile;
//! use cactus_project::project::{ProjectOptions, ProjectWrapper};
//! use cactus_project::project::launch::SystemRunner;
//!
//! let seq_file = SeqFile::from_file(Path::new("primates.txt"))?;
//! let options = ProjectOptions {
//!     cactus_root: "/opt/progressiveCactus/submodules/cactus".into(),
//!     ..ProjectOptions::default()
//! };
//! let mut project = ProjectWrapper::new(options, &seq_file, "work")?;
//! let report = project.write_and_launch(&mut SystemRunner)?;
//! println!("experiment: {}", report.experiment_path.display());
//! # Ok::<(), cactus_project::error::ProjectError>(())
//! ```
//!
//! ## 模块说明
//!
//! - [`io`] — seqfile 解析与通用 XML 元素树
//! - [`project`] — 配置文档、实验文档、外部命令与整体准备流程
//! - [`error`] — 错误类型

pub mod error;
pub mod io;
pub mod project;
