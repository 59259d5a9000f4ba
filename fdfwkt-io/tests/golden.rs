use fdfwkt_core::annotation::Annotation;
use fdfwkt_io::{FdfDocument, ScanStats};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct GoldenDocument {
    annotations: Vec<GoldenAnnotation>,
    stats: ScanStats,
}

#[derive(Debug, Serialize, Deserialize, PartialEq)]
struct GoldenAnnotation {
    annotation: Annotation,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    wkt_error: Option<String>,
}

pub fn assert_golden(name: &str, document: &FdfDocument) {
    let snapshot = GoldenDocument::from_document(document);
    let base_dir = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/data/golden");
    if let Err(err) = fs::create_dir_all(&base_dir) {
        panic!("无法创建黄金数据目录 {}: {err}", base_dir.display());
    }
    let golden_path = base_dir.join(format!("{name}.json"));
    let serialized = serde_json::to_string_pretty(&snapshot).expect("序列化黄金快照失败");

    if !golden_path.exists() {
        fs::write(&golden_path, &serialized)
            .unwrap_or_else(|err| panic!("写入黄金文件 {} 失败: {err}", golden_path.display()));
        panic!(
            "黄金文件 {} 不存在，已自动生成。请确认内容后重新运行测试。",
            golden_path.display()
        );
    }

    let expected_str = fs::read_to_string(&golden_path)
        .unwrap_or_else(|err| panic!("读取黄金文件 {} 失败: {err}", golden_path.display()));
    let expected: GoldenDocument = serde_json::from_str(&expected_str)
        .unwrap_or_else(|err| panic!("解析黄金文件 {} 失败: {err}", golden_path.display()));

    if expected != snapshot {
        let diff_path = base_dir.join(format!("{name}.actual.json"));
        fs::write(&diff_path, &serialized).expect("写入差异文件失败");
        panic!(
            "黄金文件 {} 与当前解析结果不一致。已生成对照输出 {}。",
            golden_path.display(),
            diff_path.display()
        );
    }
}

impl GoldenDocument {
    fn from_document(document: &FdfDocument) -> Self {
        let annotations = document
            .annotations
            .iter()
            .cloned()
            .map(|mut annotation| {
                let wkt_error = annotation.populate_wkt().err().map(|err| err.to_string());
                GoldenAnnotation {
                    annotation,
                    wkt_error,
                }
            })
            .collect();
        Self {
            annotations,
            stats: document.stats,
        }
    }
}
