use shared_types::{Block, BlockError, BlockId, Status};

/// What the store needs from a block.
///
/// `accept` and `reject` are application callbacks: an error leaves the block
/// undecided in the store.
pub trait ConsensusBlock {
    fn id(&self) -> BlockId;
    fn parent(&self) -> BlockId;
    fn height(&self) -> u64;
    fn timestamp(&self) -> i64;
    fn status(&self) -> Status;

    /// Structural verification against the local clock.
    fn verify(&self, now: i64) -> Result<(), BlockError>;

    fn accept(&mut self) -> Result<(), BlockError>;
    fn reject(&mut self) -> Result<(), BlockError>;
}

impl ConsensusBlock for Block {
    fn id(&self) -> BlockId {
        Block::id(self)
    }

    fn parent(&self) -> BlockId {
        self.parent_id()
    }

    fn height(&self) -> u64 {
        Block::height(self)
    }

    fn timestamp(&self) -> i64 {
        Block::timestamp(self)
    }

    fn status(&self) -> Status {
        Block::status(self)
    }

    fn verify(&self, now: i64) -> Result<(), BlockError> {
        Block::verify(self, now)
    }

    fn accept(&mut self) -> Result<(), BlockError> {
        Block::accept(self)
    }

    fn reject(&mut self) -> Result<(), BlockError> {
        Block::reject(self)
    }
}
