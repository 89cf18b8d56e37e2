#![allow(dead_code)]

use guidebook_core::{
    AuthUser, Block, BlockBody, Filter, Gateway, GatewayError, GatewayResult, ImageBlock,
    PendingAttachment, Row, SelectQuery, SqliteGateway,
};
use std::cell::Cell;

pub const BASE_URL: &str = "https://project.example";

/// Gateway wrapper that counts calls and can inject failures.
pub struct RecordingGateway<G: Gateway> {
    inner: G,
    upload_attempts: Cell<usize>,
    writes: Cell<usize>,
    /// 1-based upload attempt that fails.
    fail_upload_at: Option<usize>,
    fail_writes: bool,
}

impl<G: Gateway> RecordingGateway<G> {
    pub fn new(inner: G) -> Self {
        Self {
            inner,
            upload_attempts: Cell::new(0),
            writes: Cell::new(0),
            fail_upload_at: None,
            fail_writes: false,
        }
    }

    pub fn failing_upload_at(mut self, attempt: usize) -> Self {
        self.fail_upload_at = Some(attempt);
        self
    }

    pub fn failing_writes(mut self) -> Self {
        self.fail_writes = true;
        self
    }

    pub fn upload_attempts(&self) -> usize {
        self.upload_attempts.get()
    }

    pub fn writes(&self) -> usize {
        self.writes.get()
    }

    pub fn inner(&self) -> &G {
        &self.inner
    }

    fn record_write(&self) -> GatewayResult<()> {
        self.writes.set(self.writes.get() + 1);
        if self.fail_writes {
            return Err(GatewayError::PermissionDenied("injected write failure".to_string()));
        }
        Ok(())
    }
}

impl<G: Gateway> Gateway for RecordingGateway<G> {
    fn select(&self, collection: &str, query: &SelectQuery) -> GatewayResult<Vec<Row>> {
        self.inner.select(collection, query)
    }

    fn insert(&self, collection: &str, row: Row) -> GatewayResult<Row> {
        self.record_write()?;
        self.inner.insert(collection, row)
    }

    fn update(&self, collection: &str, patch: Row, filters: &[Filter]) -> GatewayResult<usize> {
        self.record_write()?;
        self.inner.update(collection, patch, filters)
    }

    fn delete(&self, collection: &str, filters: &[Filter]) -> GatewayResult<usize> {
        self.record_write()?;
        self.inner.delete(collection, filters)
    }

    fn current_user(&self) -> GatewayResult<Option<AuthUser>> {
        self.inner.current_user()
    }

    fn upload(
        &self,
        bucket: &str,
        path: &str,
        attachment: &PendingAttachment,
    ) -> GatewayResult<()> {
        let attempt = self.upload_attempts.get() + 1;
        self.upload_attempts.set(attempt);
        if self.fail_upload_at == Some(attempt) {
            return Err(GatewayError::Storage("injected upload failure".to_string()));
        }
        self.inner.upload(bucket, path, attachment)
    }

    fn public_url(&self, bucket: &str, path: &str) -> String {
        self.inner.public_url(bucket, path)
    }
}

pub fn sign_in(gateway: &SqliteGateway<'_>, user_id: &str) {
    gateway.set_session(Some(AuthUser::new(user_id, format!("{user_id}@example.com"))));
}

pub fn heading(content: &str) -> Block {
    Block::new(BlockBody::Heading {
        content: content.to_string(),
    })
}

pub fn text(content: &str) -> Block {
    Block::new(BlockBody::Text {
        content: content.to_string(),
    })
}

pub fn list(items: &[&str]) -> Block {
    Block::new(BlockBody::List {
        items: items.iter().map(|item| item.to_string()).collect(),
    })
}

pub fn image_file(file_name: &str, bytes: &[u8]) -> Block {
    Block::new(BlockBody::Image(ImageBlock::from_attachment(
        PendingAttachment::new(file_name, "image/png", bytes.to_vec()),
    )))
}
