mod golden;

use std::io::Write;
use std::path::PathBuf;

use fdfwkt_core::annotation::{AnnotationKind, PageRef, Rgb};
use golden::assert_golden;
use fdfwkt_io::{DocumentLoader, FdfFacade, IoError, ScanOptions};

fn fixture(name: &str) -> PathBuf {
    let mut path = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    path.push("tests/data");
    path.push(name);
    path
}

#[test]
fn load_markup_fixture_matches_expected_document() {
    let loader = FdfFacade::new();
    let doc = loader.load(&fixture("markup_basic.fdf")).expect("读取 FDF 失败");
    assert_golden("markup_basic", &doc);
}

#[test]
fn load_markup_fixture_preserves_extraction_order() {
    let loader = FdfFacade::new();
    let doc = loader.load(&fixture("markup_basic.fdf")).expect("读取 FDF 失败");
    let kinds: Vec<AnnotationKind> = doc.annotations.iter().map(|a| a.kind).collect();
    assert_eq!(
        kinds,
        vec![
            AnnotationKind::Line,
            AnnotationKind::Rectangle,
            AnnotationKind::Polygon,
            AnnotationKind::PolyLine,
            AnnotationKind::Circle,
        ]
    );
    assert!(
        doc.annotations
            .iter()
            .all(|a| a.label.as_deref() != Some("orphan")),
        "未配齐样式的对象不应出现在结果中"
    );
    assert_eq!(doc.annotations[2].page, Some(PageRef::Number(1)));
    assert_eq!(
        doc.annotations[1].properties.fill_color,
        Some(Rgb::new(0.5, 0.5, 1.0))
    );
}

#[test]
fn undecodable_line_is_equivalent_to_removed_line() {
    let with_binary: &[u8] = b"1 0 obj<</Subj(Polygon)/Vertices[0 0 4 0 4 3]/Page(0)>>\n\
        \xc3\x28\xa0\xa1\n\
        2 0 obj<</Length 9>>stream\n\
        0 0 1 rg\n\
        endstream\n";
    let without_binary: &[u8] = b"1 0 obj<</Subj(Polygon)/Vertices[0 0 4 0 4 3]/Page(0)>>\n\
        2 0 obj<</Length 9>>stream\n\
        0 0 1 rg\n\
        endstream\n";

    let facade = FdfFacade::new();
    let noisy = facade.parse_bytes(with_binary);
    let clean = facade.parse_bytes(without_binary);
    assert_eq!(noisy.annotations, clean.annotations);
    assert_eq!(noisy.annotations.len(), 1);
    assert_eq!(noisy.stats.undecodable_lines, 1);
    assert_eq!(clean.stats.undecodable_lines, 0);
}

#[test]
fn undecodable_stream_body_closes_with_empty_style() {
    let bytes: &[u8] = b"1 0 obj<</Subj(Line)/L[0 0 1 1]>>\n\
        2 0 obj<</Length 4>>stream\n\
        \xff\xff\xff\xff\n\
        endstream\n";
    let doc = FdfFacade::new().parse_bytes(bytes);
    assert_eq!(doc.annotations.len(), 1);
    assert!(doc.annotations[0].properties.is_empty());
}

#[test]
fn load_from_temp_file_with_options() {
    let mut file = tempfile::NamedTempFile::new().expect("创建临时文件失败");
    writeln!(
        file,
        "1 0 obj<</Subj(Square)/Rect[0 0 100 50]/Page(3)>>\n\
         2 0 obj<</Type/Annot/Subtype/Popup>>\n\
         3 0 obj<</Length 8>>stream\n\
         2 w\n\
         endstream"
    )
    .expect("写入临时文件失败");

    let doc = FdfFacade::new().load(file.path()).expect("读取临时 FDF 失败");
    assert_eq!(doc.annotations.len(), 1);
    let square = &doc.annotations[0];
    assert_eq!(square.vertices, "0 0 0 50 100 50 100 0");
    assert_eq!(
        square.to_wkt().expect("Square 应可转换"),
        "POLYGON((0 0, 0 50, 100 50, 100 0, 0 0))"
    );

    let strict = FdfFacade::with_options(ScanOptions {
        max_interleaved_headers: Some(0),
    });
    let doc = strict.load(file.path()).expect("读取临时 FDF 失败");
    assert!(doc.annotations.is_empty());
    assert_eq!(doc.stats.discarded_pending, 1);
}

#[test]
fn missing_file_is_a_read_error() {
    let err = FdfFacade::new()
        .load(&fixture("does_not_exist.fdf"))
        .expect_err("缺失文件应返回错误");
    match err {
        IoError::ReadError { path, .. } => assert!(path.ends_with("does_not_exist.fdf")),
    }
}
