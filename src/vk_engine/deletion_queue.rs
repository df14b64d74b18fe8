/// Destructors registered at creation time and run in reverse order.
///
/// `C` is whatever the destructors need to do their work; the engine uses
/// [`GpuContext`](crate::vk_types::GpuContext).
pub struct DeletionQueue<C> {
    deletors: Vec<Box<dyn FnOnce(&mut C)>>,
}

impl<C> Default for DeletionQueue<C> {
    fn default() -> Self {
        Self {
            deletors: Vec::new(),
        }
    }
}

impl<C> DeletionQueue<C> {
    pub fn push_function<F>(&mut self, function: F)
    where
        F: FnOnce(&mut C) + 'static,
    {
        self.deletors.push(Box::new(function));
    }

    /// Runs every destructor, last pushed first, and leaves the queue empty.
    pub fn flush(&mut self, context: &mut C) {
        while let Some(deletor) = self.deletors.pop() {
            deletor(context);
        }
    }

    pub fn len(&self) -> usize {
        self.deletors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.deletors.is_empty()
    }
}

impl<C> Drop for DeletionQueue<C> {
    fn drop(&mut self) {
        if !self.deletors.is_empty() {
            log::warn!(
                "deletion queue dropped with {} pending destructors, resources leaked",
                self.deletors.len()
            );
        }
    }
}
