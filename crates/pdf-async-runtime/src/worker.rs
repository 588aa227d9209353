use crate::{DocumentId, DocumentStore, PdfCommand, PdfUpdate, RuntimeError};
use pdf_compose::{
    ComposeOptions, DocumentSnapshot, ExportProgress, ImpositionSelection, RenderTicket,
    calculate_statistics, document_to_bytes, export_authoring, export_imposition,
    generate_preview, load_pdf,
};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::mpsc;

/// Async worker task that processes PDF commands and sends updates.
///
/// Runs until every command sender is dropped.
pub async fn worker_task(
    mut options: ComposeOptions,
    mut command_rx: mpsc::UnboundedReceiver<PdfCommand>,
    update_tx: mpsc::UnboundedSender<PdfUpdate>,
) {
    let mut store = DocumentStore::new();

    while let Some(cmd) = command_rx.recv().await {
        process_command(cmd, &mut store, &mut options, &mut command_rx, &update_tx).await;
    }
    log::debug!("Command channel closed, worker exiting");
}

async fn process_command(
    cmd: PdfCommand,
    store: &mut DocumentStore,
    options: &mut ComposeOptions,
    command_rx: &mut mpsc::UnboundedReceiver<PdfCommand>,
    update_tx: &mpsc::UnboundedSender<PdfUpdate>,
) {
    let result = match cmd {
        PdfCommand::ImposeLoad { input_path } => handle_load(input_path, store, update_tx).await,
        PdfCommand::ImposePreview {
            mut doc_id,
            mut selection,
        } => {
            // Drain any queued preview commands, keeping only the most recent
            while let Ok(next_cmd) = command_rx.try_recv() {
                if let PdfCommand::ImposePreview {
                    doc_id: new_doc_id,
                    selection: new_selection,
                } = next_cmd
                {
                    log::debug!("Discarding queued preview, using newer request");
                    doc_id = new_doc_id;
                    selection = new_selection;
                } else {
                    // Can't put it back, so it runs before the preview
                    Box::pin(process_command(next_cmd, store, options, command_rx, update_tx))
                        .await;
                }
            }

            handle_preview(doc_id, selection, store, options, update_tx).await
        }
        PdfCommand::ImposeCalculateStats { doc_id, selection } => {
            store.get(doc_id).map(|_| {
                let _ = update_tx.send(PdfUpdate::ImposeStatsCalculated {
                    stats: calculate_statistics(&selection),
                });
            })
        }
        PdfCommand::ImposeExport {
            doc_id,
            selection,
            output_dir,
        } => handle_impose_export(doc_id, selection, output_dir, store, options, update_tx).await,
        PdfCommand::ComposeExport {
            snapshot,
            output_dir,
        } => handle_compose_export(snapshot, output_dir, options, update_tx).await,
        PdfCommand::LoadConfig { path } => match ComposeOptions::load(&path).await {
            Ok(loaded) => {
                *options = loaded.clone();
                let _ = update_tx.send(PdfUpdate::ConfigLoaded { options: loaded });
                Ok(())
            }
            Err(e) => Err(e.into()),
        },
        PdfCommand::Close { doc_id } => {
            if store.remove(doc_id) {
                let _ = update_tx.send(PdfUpdate::Closed { doc_id });
                Ok(())
            } else {
                Err(RuntimeError::UnknownDocument(doc_id))
            }
        }
    };

    if let Err(e) = result {
        log::warn!("Command failed: {}", e);
        let _ = update_tx.send(PdfUpdate::Error {
            message: e.to_string(),
        });
    }
}

fn progress_sender(
    operation: &'static str,
    update_tx: &mpsc::UnboundedSender<PdfUpdate>,
) -> impl FnMut(ExportProgress) + Send + 'static {
    let update_tx = update_tx.clone();
    move |progress| {
        let _ = update_tx.send(PdfUpdate::Progress {
            operation: operation.to_string(),
            current: progress.completed,
            total: progress.total,
        });
    }
}

async fn handle_load(
    input_path: PathBuf,
    store: &mut DocumentStore,
    update_tx: &mpsc::UnboundedSender<PdfUpdate>,
) -> Result<(), RuntimeError> {
    let doc = load_pdf(&input_path).await?;
    let page_count = doc.get_pages().len();
    let name = input_path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| "document.pdf".to_string());

    let range_text = ImpositionSelection::new(page_count as u32).range_text();
    let doc_id = store.insert(name.clone(), doc);
    log::info!("Loaded {} ({} pages) as {:?}", name, page_count, doc_id);

    let _ = update_tx.send(PdfUpdate::ImposeLoaded {
        doc_id,
        name,
        page_count,
        range_text,
    });
    Ok(())
}

async fn handle_preview(
    doc_id: DocumentId,
    selection: ImpositionSelection,
    store: &DocumentStore,
    options: &ComposeOptions,
    update_tx: &mpsc::UnboundedSender<PdfUpdate>,
) -> Result<(), RuntimeError> {
    let (_, doc) = store.get(doc_id)?;
    let sheet_index = selection.current_sheet();
    let mut preview =
        generate_preview(doc, selection, options.clone(), RenderTicket::detached()).await?;
    let pdf_bytes = document_to_bytes(&mut preview)?;

    let _ = update_tx.send(PdfUpdate::ImposePreviewGenerated {
        doc_id,
        sheet_index,
        pdf_bytes,
    });
    Ok(())
}

async fn handle_impose_export(
    doc_id: DocumentId,
    selection: ImpositionSelection,
    output_dir: PathBuf,
    store: &DocumentStore,
    options: &ComposeOptions,
    update_tx: &mpsc::UnboundedSender<PdfUpdate>,
) -> Result<(), RuntimeError> {
    let (name, doc) = store.get(doc_id)?;
    let pages = selection.total_sheets();
    let file = export_imposition(
        doc,
        name,
        selection,
        options.clone(),
        RenderTicket::detached(),
        progress_sender("Imposing", update_tx),
    )
    .await?;
    let path = file.write_to(&output_dir).await?;

    let _ = update_tx.send(PdfUpdate::ExportComplete { path, pages });
    Ok(())
}

async fn handle_compose_export(
    snapshot: Arc<DocumentSnapshot>,
    output_dir: PathBuf,
    options: &ComposeOptions,
    update_tx: &mpsc::UnboundedSender<PdfUpdate>,
) -> Result<(), RuntimeError> {
    let pages = snapshot.page_count();
    let file = export_authoring(
        snapshot,
        options.clone(),
        RenderTicket::detached(),
        progress_sender("Composing", update_tx),
    )
    .await?;
    let path = file.write_to(&output_dir).await?;

    let _ = update_tx.send(PdfUpdate::ExportComplete { path, pages });
    Ok(())
}
