use crate::cursor::Cursor;

/// Ordered, append-only sequence of cursors produced by a query.
///
/// The selection owns its cursors: appending takes a fresh pinned handle at the
/// given position, so the caller may release the cursor it passed in.
#[derive(Debug, Default)]
pub struct Selection {
    cursors: Vec<Cursor>,
}

impl Selection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, cursor: &Cursor) {
        self.cursors.push(cursor.duplicate());
    }

    pub fn len(&self) -> usize {
        self.cursors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cursors.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Cursor> {
        self.cursors.get(index)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Cursor> {
        self.cursors.iter()
    }

    /// String values of all selected nodes, in selection order.
    pub fn texts(&self) -> Vec<String> {
        self.cursors.iter().map(Cursor::text).collect()
    }
}

impl<'a> IntoIterator for &'a Selection {
    type Item = &'a Cursor;
    type IntoIter = std::slice::Iter<'a, Cursor>;

    fn into_iter(self) -> Self::IntoIter {
        self.cursors.iter()
    }
}

impl IntoIterator for Selection {
    type Item = Cursor;
    type IntoIter = std::vec::IntoIter<Cursor>;

    fn into_iter(self) -> Self::IntoIter {
        self.cursors.into_iter()
    }
}
