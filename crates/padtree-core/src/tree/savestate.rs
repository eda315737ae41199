/// An opaque serialized environment state, captured from and handed back to the
/// emulator verbatim. Restoring it must reproduce the exact machine state it was
/// captured from; a node that captures one owns it exclusively.
#[derive(Debug)]
pub struct Savestate {
    data: Box<[u8]>,
}

impl Savestate {
    /// Wrap a raw state blob.
    pub fn new(data: Vec<u8>) -> Self {
        Savestate {
            data: data.into_boxed_slice(),
        }
    }

    /// Borrow the raw bytes of this savestate.
    pub fn bytes(&self) -> &[u8] {
        &self.data
    }

    /// Size of the captured blob in bytes.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Check whether the blob is empty.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

impl From<Vec<u8>> for Savestate {
    fn from(data: Vec<u8>) -> Self {
        Savestate::new(data)
    }
}
