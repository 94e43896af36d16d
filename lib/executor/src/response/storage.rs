use std::fmt;

use bytes::Bytes;

/// Hands a response buffer back to whoever produced it.
pub type ReleaseCallback = Box<dyn FnOnce(Bytes) + Send>;

struct StoredResponse {
    bytes: Bytes,
    release: Option<ReleaseCallback>,
}

/// Raw subgraph responses owned by one request.
/// Pending release callbacks run when the storage is released or dropped.
#[derive(Default)]
pub struct ResponsesStorage {
    responses: Vec<StoredResponse>,
}

impl ResponsesStorage {
    pub fn new() -> Self {
        Self {
            responses: Vec::new(),
        }
    }

    pub fn add_response(&mut self, response: Bytes, release: Option<ReleaseCallback>) -> usize {
        let new_item_index = self.responses.len();
        self.responses.push(StoredResponse {
            bytes: response,
            release,
        });
        new_item_index
    }

    pub fn get_bytes(&self, index: usize) -> Option<&[u8]> {
        self.responses.get(index).map(|stored| stored.bytes.as_ref())
    }

    pub fn len(&self) -> usize {
        self.responses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.responses.is_empty()
    }

    pub fn release_all(&mut self) {
        for mut stored in self.responses.drain(..) {
            if let Some(release) = stored.release.take() {
                release(stored.bytes);
            }
        }
    }
}

impl Drop for ResponsesStorage {
    fn drop(&mut self) {
        self.release_all();
    }
}

impl fmt::Debug for ResponsesStorage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResponsesStorage")
            .field("responses", &self.responses.len())
            .finish()
    }
}
