//! 工作目录准备：合并命令行选项到配置与实验描述，写出 XML，
//! 然后交给 `cactus_createMultiCactusProject` 生成多级比对项目。

pub mod config;
pub mod experiment;
pub mod launch;

use std::path::{Component, Path, PathBuf};

use crate::error::{ProjectError, Result};
use crate::io::seqfile::ToXmlElement;

use config::ConfigDocument;
use experiment::{Database, ExperimentDocument, KtType};
use launch::{CommandRunner, ExternalCommand, LaunchReport};

pub const CONFIG_FILE_NAME: &str = "config.xml";
pub const EXPERIMENT_FILE_NAME: &str = "expTemplate.xml";
pub const ALIGNMENT_DIR_NAME: &str = "progressiveAlignment";
pub const DEFAULT_PROJECT_TOOL: &str = "cactus_createMultiCactusProject";
pub const DEFAULT_KT_PORT: u16 = 1978;

/// 由命令行解析得到的选项
#[derive(Debug, Clone)]
pub struct ProjectOptions {
    /// 工作流配置模板；为 `None` 时使用安装目录下的默认模板
    pub config_file: Option<PathBuf>,
    pub output_maf: Option<PathBuf>,
    /// 关闭渐进式分解（整棵树作为一个子问题）
    pub legacy: bool,
    pub database: Database,
    pub kt_host: String,
    pub kt_port: u16,
    pub kt_type: KtType,
    pub kt_create_tuning: Option<String>,
    pub kt_open_tuning: Option<String>,
    /// cactus 安装根目录，用于定位默认配置模板
    pub cactus_root: PathBuf,
    pub project_tool: String,
}

impl Default for ProjectOptions {
    fn default() -> Self {
        Self {
            config_file: None,
            output_maf: None,
            legacy: false,
            database: Database::KyotoTycoon,
            kt_host: "localhost".to_string(),
            kt_port: DEFAULT_KT_PORT,
            kt_type: KtType::Memory,
            kt_create_tuning: None,
            kt_open_tuning: None,
            cactus_root: PathBuf::from("."),
            project_tool: DEFAULT_PROJECT_TOOL.to_string(),
        }
    }
}

/// 一次性的准备流程：`new` 在内存中构建两份文档，
/// `write_and_launch` 写盘并调用外部工具。
#[derive(Debug)]
pub struct ProjectWrapper {
    options: ProjectOptions,
    working_dir: PathBuf,
    config: ConfigDocument,
    experiment: ExperimentDocument,
}

impl ProjectWrapper {
    pub fn new<S>(options: ProjectOptions, seq_file: &S, working_dir: impl Into<PathBuf>) -> Result<Self>
    where
        S: ToXmlElement + ?Sized,
    {
        let config = build_config(&options)?;
        let experiment = build_experiment(&options, seq_file)?;
        Ok(Self { options, working_dir: working_dir.into(), config, experiment })
    }

    pub fn options(&self) -> &ProjectOptions {
        &self.options
    }

    pub fn working_dir(&self) -> &Path {
        &self.working_dir
    }

    pub fn config(&self) -> &ConfigDocument {
        &self.config
    }

    pub fn experiment(&self) -> &ExperimentDocument {
        &self.experiment
    }

    /// 写出 `config.xml` / `expTemplate.xml`，清空 `progressiveAlignment/`，
    /// 再以实验文件和该目录为参数调用项目生成工具。
    ///
    /// 外部工具的退出码只记录在报告中，不转换为错误。
    /// 比对目录会被无条件删除，两次运行不能共用同一个工作目录。
    pub fn write_and_launch<R>(&mut self, runner: &mut R) -> Result<LaunchReport>
    where
        R: CommandRunner + ?Sized,
    {
        if !self.working_dir.is_dir() {
            return Err(ProjectError::MissingWorkingDir(self.working_dir.clone()));
        }
        let work = absolute(&self.working_dir)?;
        let config_path = work.join(CONFIG_FILE_NAME);
        let experiment_path = work.join(EXPERIMENT_FILE_NAME);

        self.experiment.set_config_path(&config_path);
        self.config.write_file(&config_path)?;
        self.experiment.write_file(&experiment_path)?;
        log::info!("wrote {}", config_path.display());
        log::info!("wrote {}", experiment_path.display());

        let alignment_dir = work.join(ALIGNMENT_DIR_NAME);
        remove_existing(&alignment_dir)?;

        let command = ExternalCommand::new(self.options.project_tool.as_str())
            .arg(&experiment_path)
            .arg(&alignment_dir);
        log::info!("running: {}", command);
        let exit_code = runner.run(&command)?;
        match exit_code {
            Some(0) => {}
            Some(code) => log::warn!("{} exited with status {}", command.program, code),
            None => log::warn!("{} was terminated by a signal", command.program),
        }

        Ok(LaunchReport { config_path, experiment_path, alignment_dir, command, exit_code })
    }
}

fn build_config(options: &ProjectOptions) -> Result<ConfigDocument> {
    let path = match &options.config_file {
        Some(p) => p.clone(),
        None => config::default_config_path(&options.cactus_root),
    };
    log::debug!("loading workflow config {}", path.display());
    let mut cfg = ConfigDocument::load(&path)?;

    cfg.set_build_hal(true)?;
    cfg.set_build_fasta(true)?;
    if options.output_maf.is_some() {
        cfg.set_build_maf(true)?;
        cfg.set_join_maf(true)?;
    }
    // legacy: the whole tree becomes one subproblem, i.e. non-progressive cactus
    if options.legacy {
        cfg.set_subtree_size(i64::MAX)?;
    }
    Ok(cfg)
}

fn build_experiment<S>(options: &ProjectOptions, seq_file: &S) -> Result<ExperimentDocument>
where
    S: ToXmlElement + ?Sized,
{
    let mut exp = ExperimentDocument::new(seq_file.to_xml_element(), options.database);

    if options.database == Database::KyotoTycoon {
        exp.set_db_host(&options.kt_host)?;
        exp.set_db_port(options.kt_port)?;
        exp.set_db_in_memory(options.kt_type.in_memory())?;
        exp.set_db_snapshot(options.kt_type.snapshot())?;
        // server options are never forwarded: the db conf cannot carry spaces
        if let Some(tuning) = &options.kt_create_tuning {
            exp.set_db_create_tuning_options(tuning)?;
        }
        if let Some(tuning) = &options.kt_open_tuning {
            exp.set_db_read_tuning_options(tuning)?;
        }
    }
    log::debug!("experiment database: {}", options.database);
    Ok(exp)
}

/// 与 `os.path.abspath` 一致：补全为绝对路径并按字面折叠 `.` 和 `..`，不解析符号链接
fn absolute(path: &Path) -> Result<PathBuf> {
    let joined = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()?.join(path)
    };
    let mut out = PathBuf::new();
    for comp in joined.components() {
        match comp {
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            other => out.push(other),
        }
    }
    Ok(out)
}

fn remove_existing(path: &Path) -> Result<()> {
    match std::fs::symlink_metadata(path) {
        Ok(meta) => {
            log::info!("removing existing {}", path.display());
            if meta.is_dir() {
                std::fs::remove_dir_all(path)?;
            } else {
                std::fs::remove_file(path)?;
            }
            Ok(())
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e.into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::xml::XmlElement;

    const TEMPLATE: &str = r#"<cactus_workflow_config>
  <multi_cactus><decomposition subtree_size="2"/></multi_cactus>
  <hal buildHal="0" buildFasta="0" buildMaf="0" joinMaf="0"/>
</cactus_workflow_config>"#;

    struct FixedDescriptor;

    impl ToXmlElement for FixedDescriptor {
        fn to_xml_element(&self) -> XmlElement {
            let mut e = XmlElement::new("cactus_workflow_experiment");
            e.set_attr("sequences", "/g/a.fa /g/b.fa");
            e
        }
    }

    fn options_with_template(dir: &Path) -> ProjectOptions {
        let cfg = dir.join("template.xml");
        std::fs::write(&cfg, TEMPLATE).unwrap();
        ProjectOptions { config_file: Some(cfg), ..ProjectOptions::default() }
    }

    #[test]
    fn default_template_comes_from_cactus_root() {
        let dir = tempfile::tempdir().unwrap();
        let progressive = dir.path().join("progressive");
        std::fs::create_dir(&progressive).unwrap();
        std::fs::write(progressive.join("cactus_progressive_workflow_config.xml"), TEMPLATE).unwrap();

        let opts = ProjectOptions { cactus_root: dir.path().to_path_buf(), ..ProjectOptions::default() };
        let wrapper = ProjectWrapper::new(opts, &FixedDescriptor, dir.path()).unwrap();
        assert_eq!(wrapper.config().build_hal(), Some(true));
    }

    #[test]
    fn kt_type_maps_to_memory_and_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        let cases = [
            (KtType::Memory, true, false),
            (KtType::Snapshot, true, true),
            (KtType::Disk, false, false),
        ];
        for (kt_type, in_memory, snapshot) in cases {
            let opts = ProjectOptions { kt_type, ..options_with_template(dir.path()) };
            let wrapper = ProjectWrapper::new(opts, &FixedDescriptor, dir.path()).unwrap();
            assert_eq!(wrapper.experiment().db_in_memory(), Some(in_memory), "{kt_type}");
            assert_eq!(wrapper.experiment().db_snapshot(), Some(snapshot), "{kt_type}");
        }
    }

    #[test]
    fn unparsable_template_is_config_load_error() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = dir.path().join("broken.xml");
        std::fs::write(&cfg, "<cactus_workflow_config><hal>").unwrap();
        let opts = ProjectOptions { config_file: Some(cfg), ..ProjectOptions::default() };
        let err = ProjectWrapper::new(opts, &FixedDescriptor, dir.path()).unwrap_err();
        assert!(matches!(err, ProjectError::ConfigLoad { .. }));
    }

    #[test]
    fn absolute_paths_are_normalized() {
        let cwd = std::env::current_dir().unwrap();
        assert_eq!(absolute(Path::new(".")).unwrap(), cwd);
        assert_eq!(absolute(Path::new("./work/.")).unwrap(), cwd.join("work"));
        assert_eq!(absolute(Path::new("/a/./b/../c")).unwrap(), PathBuf::from("/a/c"));
        assert_eq!(
            absolute(Path::new(".")).unwrap().join(CONFIG_FILE_NAME),
            cwd.join(CONFIG_FILE_NAME)
        );
    }

    #[test]
    fn dotted_working_dir_writes_clean_config_reference() {
        let dir = tempfile::tempdir().unwrap();
        let sub = dir.path().join("sub");
        std::fs::create_dir(&sub).unwrap();
        let dotted = sub.join(".").join("..").join(".");

        let opts = options_with_template(dir.path());
        let mut project = ProjectWrapper::new(opts, &FixedDescriptor, dotted).unwrap();
        let report = project.write_and_launch(&mut ExitZero).unwrap();
        assert_eq!(report.config_path, dir.path().join(CONFIG_FILE_NAME));
        assert_eq!(project.experiment().config_path(), report.config_path.to_str());
    }

    struct ExitZero;

    impl CommandRunner for ExitZero {
        fn run(&mut self, _command: &ExternalCommand) -> Result<Option<i32>> {
            Ok(Some(0))
        }
    }

    #[test]
    fn remove_existing_handles_files_and_absence() {
        let dir = tempfile::tempdir().unwrap();
        let p = dir.path().join(ALIGNMENT_DIR_NAME);
        remove_existing(&p).unwrap();
        std::fs::write(&p, "stale").unwrap();
        remove_existing(&p).unwrap();
        assert!(!p.exists());
    }
}
