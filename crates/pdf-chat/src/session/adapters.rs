//! Ingestion and conversation adapters between the UI and the knowledge base

use std::path::Path;
use std::time::Instant;

use crate::error::{Error, Result};
use crate::types::{ConversationEntry, DataType, IngestSummary, UploadedDocument};

use super::store::Session;

/// Add an uploaded PDF to the session's knowledge base.
///
/// The payload is written to a temporary `.pdf` file that is removed before
/// this returns, whatever the outcome. Any failure is reported as
/// [`Error::Ingestion`] and leaves the conversation untouched.
pub async fn ingest_document(session: &Session, upload: UploadedDocument) -> Result<IngestSummary> {
    ingest_document_in(session, upload, &std::env::temp_dir()).await
}

pub(crate) async fn ingest_document_in(
    session: &Session,
    upload: UploadedDocument,
    temp_dir: &Path,
) -> Result<IngestSummary> {
    let _action = session.begin_action().await;
    session.touch();

    let filename = upload.filename.clone();
    let start = Instant::now();

    if !upload.declares_pdf() {
        return Err(Error::ingestion(
            &filename,
            format!("expected a PDF file, got '{}'", upload.media_type),
        ));
    }
    if !upload.has_pdf_signature() {
        return Err(Error::ingestion(&filename, "file is not a valid PDF"));
    }

    let kb = session
        .knowledge_base()
        .await
        .map_err(|e| Error::ingestion(&filename, e.to_string()))?;

    let temp = tempfile::Builder::new()
        .prefix("pdf-chat-upload-")
        .suffix(".pdf")
        .tempfile_in(temp_dir)
        .map_err(|e| Error::ingestion(&filename, format!("could not stage upload: {}", e)))?;

    tracing::debug!("Staged '{}' ({} bytes) at {:?}", filename, upload.len(), temp.path());

    let result = match tokio::fs::write(temp.path(), &upload.data).await {
        Ok(()) => kb.add_as(temp.path(), DataType::PdfFile, &filename).await,
        Err(e) => Err(e.into()),
    };

    if let Err(e) = temp.close() {
        tracing::warn!("Failed to remove staged upload for '{}': {}", filename, e);
    }

    match result {
        Ok(outcome) => {
            let summary = IngestSummary::from_outcome(&filename, &outcome, start.elapsed().as_millis() as u64);
            tracing::info!("Session {}: {}", session.id(), summary.message());
            Ok(summary)
        }
        Err(e) => {
            tracing::warn!("Session {}: ingestion of '{}' failed: {}", session.id(), filename, e);
            Err(Error::ingestion(&filename, e.to_string()))
        }
    }
}

/// Ask the knowledge base a question.
///
/// Blank queries are ignored and return `Ok(None)`. Otherwise the user entry is
/// appended first; the assistant entry is appended only when an answer arrives.
pub async fn submit_query(session: &Session, query: &str) -> Result<Option<String>> {
    if query.trim().is_empty() {
        return Ok(None);
    }

    let _action = session.begin_action().await;
    session.touch();

    let memory = session.entries();
    session.append(ConversationEntry::user(query));

    let answer = match session.knowledge_base().await {
        Ok(kb) => kb.chat_with_history(query, &memory).await,
        Err(e) => Err(e),
    };

    match answer {
        Ok(answer) => {
            session.append(ConversationEntry::assistant(answer.clone()));
            Ok(Some(answer))
        }
        Err(e) => {
            tracing::warn!("Session {}: chat failed: {}", session.id(), e);
            Err(Error::chat(e.to_string()))
        }
    }
}

/// Empty the conversation once any running action has finished
pub async fn clear_history(session: &Session) {
    let _action = session.begin_action().await;
    session.touch();
    session.clear();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{sample_pdf, FakeFactory};
    use crate::types::Role;
    use std::sync::Arc;
    use uuid::Uuid;

    fn session(factory: FakeFactory) -> Session {
        Session::new(Uuid::new_v4(), Arc::new(factory))
    }

    fn dir_is_empty(dir: &Path) -> bool {
        std::fs::read_dir(dir).unwrap().next().is_none()
    }

    #[tokio::test]
    async fn test_upload_then_converse_then_clear() {
        let s = session(FakeFactory::answering("It reports steady growth."));
        let scratch = tempfile::tempdir().unwrap();

        let upload = UploadedDocument::pdf("doc.pdf", sample_pdf("The quarterly summary reports steady growth."));
        let summary = tokio_test::assert_ok!(ingest_document_in(&s, upload, scratch.path()).await);
        assert_eq!(summary.filename, "doc.pdf");
        assert!(!summary.duplicate);
        assert!(summary.chunks_created >= 1);
        assert!(s.is_empty());
        assert!(dir_is_empty(scratch.path()));

        let answer = submit_query(&s, "What is the summary?").await.unwrap();
        assert_eq!(answer.as_deref(), Some("It reports steady growth."));
        let roles: Vec<Role> = s.entries().iter().map(|e| e.role()).collect();
        assert_eq!(roles, vec![Role::User, Role::Assistant]);
        assert_eq!(s.entries()[0].content(), "What is the summary?");

        assert_eq!(submit_query(&s, "").await.unwrap(), None);
        assert_eq!(submit_query(&s, "   \n").await.unwrap(), None);
        assert_eq!(s.len(), 2);

        clear_history(&s).await;
        assert!(s.entries().is_empty());
    }

    #[tokio::test]
    async fn test_each_successful_query_adds_two_entries() {
        let s = session(FakeFactory::answering("answer"));
        for i in 1..=3 {
            submit_query(&s, &format!("question {}", i)).await.unwrap();
            assert_eq!(s.len(), i * 2);
        }
    }

    #[tokio::test]
    async fn test_failed_query_keeps_only_user_entry() {
        let s = session(FakeFactory::failing());

        let err = tokio_test::assert_err!(submit_query(&s, "Will this work?").await);
        assert!(matches!(err, Error::Chat(_)));
        assert_eq!(s.len(), 1);
        assert!(s.entries()[0].is_user());

        submit_query(&s, "Again?").await.unwrap_err();
        assert_eq!(s.len(), 2);
    }

    #[tokio::test]
    async fn test_corrupted_upload_is_ingestion_error() {
        let s = session(FakeFactory::answering("a"));
        s.append(ConversationEntry::user("earlier"));
        let scratch = tempfile::tempdir().unwrap();

        let upload = UploadedDocument::pdf("broken.pdf", &b"%PDF-1.7 not really"[..]);
        let err = ingest_document_in(&s, upload, scratch.path()).await.unwrap_err();

        match err {
            Error::Ingestion { filename, .. } => assert_eq!(filename, "broken.pdf"),
            other => panic!("expected ingestion error, got {:?}", other),
        }
        assert_eq!(s.len(), 1);
        assert!(dir_is_empty(scratch.path()));
    }

    #[tokio::test]
    async fn test_non_pdf_upload_never_reaches_knowledge_base() {
        let factory = Arc::new(FakeFactory::answering("a"));
        let s = Session::new(Uuid::new_v4(), factory.clone());

        let upload = UploadedDocument::new("notes.txt", "text/plain", bytes::Bytes::from_static(b"hello"));
        assert!(matches!(
            ingest_document(&s, upload).await,
            Err(Error::Ingestion { .. })
        ));

        let disguised = UploadedDocument::pdf("image.pdf", &b"\x89PNG\r\n"[..]);
        assert!(matches!(
            ingest_document(&s, disguised).await,
            Err(Error::Ingestion { .. })
        ));

        assert_eq!(factory.created(), 0);
    }

    #[tokio::test]
    async fn test_same_upload_twice_is_duplicate() {
        let s = session(FakeFactory::answering("a"));
        let pdf = sample_pdf("A document that is uploaded two times.");

        let first = ingest_document(&s, UploadedDocument::pdf("a.pdf", pdf.clone())).await.unwrap();
        let second = ingest_document(&s, UploadedDocument::pdf("a.pdf", pdf)).await.unwrap();

        assert!(!first.duplicate);
        assert!(second.duplicate);
        assert_eq!(first.document_id, second.document_id);
        assert!(second.message().contains("already"));
    }
}
