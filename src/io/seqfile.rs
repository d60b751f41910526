//! Progressive Cactus 的 seqfile 解析。
//!
//! 格式：
//! ```text
//! # 注释行与空行被忽略
//! ((human:0.006,chimp:0.006):0.003,gorilla:0.008);
//! human /data/human.fa
//! *chimp /data/chimp.fa
//! gorilla gorilla.fa
//! ```
//! 第一行内容若以 `(` 开头则视为 Newick 物种树；省略时按文件顺序生成星形树。
//! 名字前的 `*` 表示该基因组为参考质量组装。

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::error::{ProjectError, Result};
use crate::io::xml::XmlElement;

pub const EXPERIMENT_ELEMENT: &str = "cactus_workflow_experiment";
pub const DEFAULT_EXPERIMENT_CONFIG: &str = "defaultProgressive";
const STAR_TREE_BRANCH_LEN: f64 = 1.0;

/// 能把自身渲染为实验描述根元素的输入描述。
pub trait ToXmlElement {
    fn to_xml_element(&self) -> XmlElement;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Genome {
    pub name: String,
    pub path: PathBuf,
    pub reference_quality: bool,
}

#[derive(Debug, Clone)]
pub struct SeqFile {
    tree: String,
    leaves: Vec<String>,
    genomes: Vec<Genome>,
}

impl SeqFile {
    /// 相对序列路径按当前目录解析
    pub fn from_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        let cwd = std::env::current_dir()?;
        Self::parse_str(&text, &cwd)
    }

    pub fn parse_str(text: &str, base_dir: &Path) -> Result<Self> {
        let mut tree: Option<(usize, String)> = None;
        let mut genomes: Vec<Genome> = Vec::new();
        let mut seen: HashMap<String, usize> = HashMap::new();

        for (idx, raw) in text.lines().enumerate() {
            let line_no = idx + 1;
            let line = raw.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            if line.starts_with('(') {
                if tree.is_some() || !genomes.is_empty() {
                    return Err(seqfile_error(line_no, "tree must be the first entry"));
                }
                if !line.ends_with(';') {
                    return Err(seqfile_error(line_no, "Newick tree must end with ';'"));
                }
                tree = Some((line_no, line.to_string()));
                continue;
            }

            let mut parts = line.splitn(2, char::is_whitespace);
            let raw_name = parts.next().unwrap_or("");
            let path = parts.next().map(str::trim).unwrap_or("");
            if path.is_empty() {
                return Err(seqfile_error(line_no, format!("no path given for '{}'", raw_name)));
            }
            if is_url(path) {
                return Err(seqfile_error(line_no, format!("URL paths are not supported: {}", path)));
            }

            let (name, reference_quality) = match raw_name.strip_prefix('*') {
                Some(rest) => (rest, true),
                None => (raw_name, false),
            };
            if name.is_empty() {
                return Err(seqfile_error(line_no, "empty genome name"));
            }
            if let Some(first) = seen.insert(name.to_string(), line_no) {
                return Err(seqfile_error(
                    line_no,
                    format!("genome '{}' already defined on line {}", name, first),
                ));
            }

            let path = Path::new(path);
            let path = if path.is_absolute() { path.to_path_buf() } else { base_dir.join(path) };
            genomes.push(Genome { name: name.to_string(), path, reference_quality });
        }

        if genomes.is_empty() {
            return Err(seqfile_error(0, "no genomes listed"));
        }

        let (tree, leaves) = match tree {
            Some((line_no, tree)) => {
                let leaves = newick_leaves(&tree);
                if let Some(missing) = leaves.iter().find(|l| !seen.contains_key(l.as_str())) {
                    return Err(seqfile_error(
                        line_no,
                        format!("tree leaf '{}' has no sequence path", missing),
                    ));
                }
                for g in genomes.iter().filter(|g| !leaves.contains(&g.name)) {
                    log::warn!("genome '{}' is not in the species tree and will be ignored", g.name);
                }
                (tree, leaves)
            }
            None => {
                let leaves: Vec<String> = genomes.iter().map(|g| g.name.clone()).collect();
                (star_tree(&leaves), leaves)
            }
        };

        Ok(Self { tree, leaves, genomes })
    }

    pub fn tree(&self) -> &str {
        &self.tree
    }

    pub fn genomes(&self) -> &[Genome] {
        &self.genomes
    }

    pub fn genome(&self, name: &str) -> Option<&Genome> {
        self.genomes.iter().find(|g| g.name == name)
    }

    /// 按树叶顺序返回参与比对的基因组
    pub fn leaf_genomes(&self) -> impl Iterator<Item = &Genome> + '_ {
        self.leaves.iter().filter_map(move |l| self.genome(l))
    }
}

impl ToXmlElement for SeqFile {
    fn to_xml_element(&self) -> XmlElement {
        let mut elem = XmlElement::new(EXPERIMENT_ELEMENT);
        let sequences: Vec<String> = self
            .leaf_genomes()
            .map(|g| g.path.to_string_lossy().into_owned())
            .collect();
        elem.set_attr("sequences", sequences.join(" "));
        elem.set_attr("species_tree", self.tree.as_str());
        elem.set_attr("config", DEFAULT_EXPERIMENT_CONFIG);

        let reference: Vec<&str> = self
            .leaf_genomes()
            .filter(|g| g.reference_quality)
            .map(|g| g.name.as_str())
            .collect();
        if !reference.is_empty() {
            elem.set_attr("reference_quality", reference.join(" "));
        }
        elem
    }
}

fn seqfile_error(line: usize, message: impl Into<String>) -> ProjectError {
    ProjectError::SeqFile { line, message: message.into() }
}

fn is_url(path: &str) -> bool {
    ["http://", "https://", "ftp://"].iter().any(|p| path.starts_with(p))
}

fn star_tree(names: &[String]) -> String {
    let branches: Vec<String> = names
        .iter()
        .map(|n| format!("{}:{}", n, STAR_TREE_BRANCH_LEN))
        .collect();
    format!("({});", branches.join(","))
}

/// 提取 Newick 串中的叶节点名（内部节点标签跳过）
fn newick_leaves(tree: &str) -> Vec<String> {
    let mut leaves = Vec::new();
    let mut token = String::new();
    let mut in_branch_len = false;
    // a label is a leaf unless it directly follows ')'
    let mut after_close = false;

    for ch in tree.chars() {
        match ch {
            '(' | ',' | ')' | ';' => {
                let name = token.trim().trim_matches('\'');
                if !name.is_empty() && !after_close {
                    leaves.push(name.to_string());
                }
                token.clear();
                in_branch_len = false;
                after_close = ch == ')';
            }
            ':' => in_branch_len = true,
            _ if !in_branch_len => token.push(ch),
            _ => {}
        }
    }
    leaves
}
