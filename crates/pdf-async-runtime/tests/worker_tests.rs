use lopdf::{Dictionary, Document, Object, Stream};
use pdf_async_runtime::*;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::mpsc;

fn create_test_pdf(num_pages: usize) -> Document {
    let mut doc = Document::with_version("1.7");
    let pages_id = doc.new_object_id();

    let mut kids = Vec::new();
    for i in 0..num_pages {
        let text = format!("BT /F1 24 Tf 72 720 Td (Page {}) Tj ET", i + 1);
        let content_id = doc.add_object(Stream::new(Dictionary::new(), text.into_bytes()));

        let page_id = doc.add_object(Dictionary::from_iter(vec![
            ("Type", Object::Name(b"Page".to_vec())),
            ("Parent", Object::Reference(pages_id)),
            (
                "MediaBox",
                Object::Array(vec![
                    Object::Integer(0),
                    Object::Integer(0),
                    Object::Integer(612),
                    Object::Integer(792),
                ]),
            ),
            ("Resources", Object::Dictionary(Dictionary::new())),
            ("Contents", Object::Reference(content_id)),
        ]));
        kids.push(Object::Reference(page_id));
    }

    let pages_dict = Dictionary::from_iter(vec![
        ("Type", Object::Name(b"Pages".to_vec())),
        ("Kids", Object::Array(kids)),
        ("Count", Object::Integer(num_pages as i64)),
    ]);
    doc.objects.insert(pages_id, Object::Dictionary(pages_dict));

    let catalog_id = doc.add_object(Dictionary::from_iter(vec![
        ("Type", Object::Name(b"Catalog".to_vec())),
        ("Pages", Object::Reference(pages_id)),
    ]));
    doc.trailer.set("Root", catalog_id);

    doc
}

fn write_test_pdf(dir: &Path, name: &str, num_pages: usize) -> PathBuf {
    let mut doc = create_test_pdf(num_pages);
    let mut bytes = Vec::new();
    doc.save_to(&mut bytes).unwrap();
    let path = dir.join(name);
    std::fs::write(&path, bytes).unwrap();
    path
}

fn spawn_worker() -> (
    mpsc::UnboundedSender<PdfCommand>,
    mpsc::UnboundedReceiver<PdfUpdate>,
) {
    let (command_tx, command_rx) = mpsc::unbounded_channel();
    let (update_tx, update_rx) = mpsc::unbounded_channel();
    tokio::spawn(worker_task(ComposeOptions::default(), command_rx, update_tx));
    (command_tx, update_rx)
}

async fn load(
    command_tx: &mpsc::UnboundedSender<PdfCommand>,
    update_rx: &mut mpsc::UnboundedReceiver<PdfUpdate>,
    path: PathBuf,
) -> DocumentId {
    command_tx
        .send(PdfCommand::ImposeLoad { input_path: path })
        .unwrap();
    match update_rx.recv().await.unwrap() {
        PdfUpdate::ImposeLoaded { doc_id, .. } => doc_id,
        other => panic!("Expected ImposeLoaded, got {:?}", other),
    }
}

#[tokio::test]
async fn test_load_reports_pages_and_range() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_test_pdf(dir.path(), "deck.pdf", 6);
    let (command_tx, mut update_rx) = spawn_worker();

    command_tx
        .send(PdfCommand::ImposeLoad { input_path: path })
        .unwrap();

    match update_rx.recv().await.unwrap() {
        PdfUpdate::ImposeLoaded {
            name,
            page_count,
            range_text,
            ..
        } => {
            assert_eq!(name, "deck.pdf");
            assert_eq!(page_count, 6);
            assert_eq!(range_text, "1-6");
        }
        other => panic!("Expected ImposeLoaded, got {:?}", other),
    }
}

#[tokio::test]
async fn test_load_missing_file_reports_error() {
    let dir = tempfile::tempdir().unwrap();
    let (command_tx, mut update_rx) = spawn_worker();

    command_tx
        .send(PdfCommand::ImposeLoad {
            input_path: dir.path().join("missing.pdf"),
        })
        .unwrap();

    assert!(matches!(
        update_rx.recv().await.unwrap(),
        PdfUpdate::Error { .. }
    ));
}

#[tokio::test]
async fn test_stats_for_selection() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_test_pdf(dir.path(), "deck.pdf", 10);
    let (command_tx, mut update_rx) = spawn_worker();
    let doc_id = load(&command_tx, &mut update_rx, path).await;

    let mut selection = ImpositionSelection::new(10);
    selection.set_pages_per_sheet(4);
    command_tx
        .send(PdfCommand::ImposeCalculateStats { doc_id, selection })
        .unwrap();

    match update_rx.recv().await.unwrap() {
        PdfUpdate::ImposeStatsCalculated { stats } => {
            assert_eq!(stats.output_sheets, 3);
            assert_eq!(stats.pages_on_last_sheet, 2);
        }
        other => panic!("Expected stats, got {:?}", other),
    }
}

#[tokio::test]
async fn test_queued_previews_collapse_to_newest() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_test_pdf(dir.path(), "deck.pdf", 8);
    let (command_tx, mut update_rx) = spawn_worker();
    let doc_id = load(&command_tx, &mut update_rx, path).await;

    let mut selection = ImpositionSelection::new(8);
    selection.set_pages_per_sheet(2);
    for _ in 0..3 {
        command_tx
            .send(PdfCommand::ImposePreview {
                doc_id,
                selection: selection.clone(),
            })
            .unwrap();
        selection.next_sheet();
    }
    command_tx.send(PdfCommand::Close { doc_id }).unwrap();

    // The close was queued behind the previews, so it runs during the drain
    // and the surviving preview then fails on the closed handle
    let mut previews = Vec::new();
    let mut closed = false;
    let mut errors = 0;
    for _ in 0..2 {
        match update_rx.recv().await.unwrap() {
            PdfUpdate::ImposePreviewGenerated { sheet_index, .. } => previews.push(sheet_index),
            PdfUpdate::Closed { .. } => closed = true,
            PdfUpdate::Error { .. } => errors += 1,
            other => panic!("Unexpected update {:?}", other),
        }
    }

    assert!(closed);
    assert!(previews.is_empty());
    assert_eq!(errors, 1);
}

#[tokio::test]
async fn test_preview_uses_latest_sheet() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_test_pdf(dir.path(), "deck.pdf", 8);
    let (command_tx, mut update_rx) = spawn_worker();
    let doc_id = load(&command_tx, &mut update_rx, path).await;

    let mut selection = ImpositionSelection::new(8);
    selection.set_pages_per_sheet(2);
    for _ in 0..3 {
        command_tx
            .send(PdfCommand::ImposePreview {
                doc_id,
                selection: selection.clone(),
            })
            .unwrap();
        selection.next_sheet();
    }

    match update_rx.recv().await.unwrap() {
        PdfUpdate::ImposePreviewGenerated {
            sheet_index,
            pdf_bytes,
            ..
        } => {
            assert_eq!(sheet_index, 2);
            let preview = Document::load_mem(&pdf_bytes).unwrap();
            assert_eq!(preview.get_pages().len(), 1);
        }
        other => panic!("Expected preview, got {:?}", other),
    }
}

#[tokio::test]
async fn test_impose_export_writes_file_with_progress() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_test_pdf(dir.path(), "deck.pdf", 5);
    let out_dir = tempfile::tempdir().unwrap();
    let (command_tx, mut update_rx) = spawn_worker();
    let doc_id = load(&command_tx, &mut update_rx, path).await;

    let mut selection = ImpositionSelection::new(5);
    selection.set_pages_per_sheet(2);
    command_tx
        .send(PdfCommand::ImposeExport {
            doc_id,
            selection,
            output_dir: out_dir.path().to_path_buf(),
        })
        .unwrap();

    let mut progress_updates = 0;
    loop {
        match update_rx.recv().await.unwrap() {
            PdfUpdate::Progress { total, .. } => {
                assert_eq!(total, 3);
                progress_updates += 1;
            }
            PdfUpdate::ExportComplete { path, pages } => {
                assert_eq!(pages, 3);
                assert_eq!(path, out_dir.path().join("edited_deck.pdf"));
                let written = Document::load(&path).unwrap();
                assert_eq!(written.get_pages().len(), 3);
                break;
            }
            other => panic!("Unexpected update {:?}", other),
        }
    }
    assert!(progress_updates > 0);
}

#[tokio::test]
async fn test_compose_export_of_empty_document() {
    let out_dir = tempfile::tempdir().unwrap();
    let (command_tx, mut update_rx) = spawn_worker();

    let model = pdf_compose::DocumentModel::new(Orientation::Portrait, &ComposeOptions::default());
    let snapshot: Arc<DocumentSnapshot> = model.snapshot();
    command_tx
        .send(PdfCommand::ComposeExport {
            snapshot,
            output_dir: out_dir.path().to_path_buf(),
        })
        .unwrap();

    loop {
        match update_rx.recv().await.unwrap() {
            PdfUpdate::Progress { .. } => continue,
            PdfUpdate::ExportComplete { path, pages } => {
                assert_eq!(pages, 1);
                let name = path.file_name().unwrap().to_string_lossy().into_owned();
                assert!(name.starts_with("print_"));
                assert!(name.ends_with(".pdf"));
                break;
            }
            other => panic!("Unexpected update {:?}", other),
        }
    }
}

#[tokio::test]
async fn test_load_config() {
    let dir = tempfile::tempdir().unwrap();
    let config_path = dir.path().join("compose.json");
    let options = ComposeOptions {
        jpeg_quality: 80,
        ..ComposeOptions::default()
    };
    options.save(&config_path).await.unwrap();

    let bad_path = dir.path().join("bad.json");
    std::fs::write(&bad_path, b"{ not json").unwrap();

    let (command_tx, mut update_rx) = spawn_worker();
    command_tx
        .send(PdfCommand::LoadConfig { path: config_path })
        .unwrap();
    command_tx
        .send(PdfCommand::LoadConfig { path: bad_path })
        .unwrap();

    match update_rx.recv().await.unwrap() {
        PdfUpdate::ConfigLoaded { options: loaded } => assert_eq!(loaded.jpeg_quality, 80),
        other => panic!("Expected ConfigLoaded, got {:?}", other),
    }
    assert!(matches!(
        update_rx.recv().await.unwrap(),
        PdfUpdate::Error { .. }
    ));
}

#[tokio::test]
async fn test_close_unknown_document() {
    let (command_tx, mut update_rx) = spawn_worker();
    command_tx
        .send(PdfCommand::Close {
            doc_id: DocumentId(u64::MAX),
        })
        .unwrap();

    match update_rx.recv().await.unwrap() {
        PdfUpdate::Error { message } => assert!(message.contains("Unknown document")),
        other => panic!("Expected error, got {:?}", other),
    }
}
