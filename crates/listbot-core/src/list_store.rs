/// The named lists the bot manages.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ListKind {
    Books,
    Products,
}

impl ListKind {
    pub const ALL: [ListKind; 2] = [ListKind::Books, ListKind::Products];

    /// Resolve a user-supplied entity token (`book`, `Products`, ...).
    pub fn from_entity(token: &str) -> Option<Self> {
        match token.to_lowercase().as_str() {
            "book" | "books" => Some(ListKind::Books),
            "product" | "products" => Some(ListKind::Products),
            _ => None,
        }
    }

    fn slot(self) -> usize {
        match self {
            ListKind::Books => 0,
            ListKind::Products => 1,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            ListKind::Books => "books",
            ListKind::Products => "products",
        }
    }

    /// Heading used when the list is rendered for a chat.
    pub fn title(self) -> &'static str {
        match self {
            ListKind::Books => "📚 Books",
            ListKind::Products => "🛒 Products",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum ListError {
    #[error("index {index} is out of range (list has {len} items)")]
    OutOfRange { index: usize, len: usize },
}

/// An ordered list of strings addressed with 1-based indices from the outside.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NamedList {
    kind: ListKind,
    items: Vec<String>,
}

impl NamedList {
    pub fn new(kind: ListKind) -> Self {
        Self {
            kind,
            items: Vec::new(),
        }
    }

    pub fn items(&self) -> &[String] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn append(&mut self, item: impl Into<String>) {
        self.items.push(item.into());
    }

    /// Replace the item at 1-based `index`, returning the previous value.
    pub fn replace(
        &mut self,
        index: usize,
        item: impl Into<String>,
    ) -> Result<String, ListError> {
        let pos = self.position(index)?;
        Ok(std::mem::replace(&mut self.items[pos], item.into()))
    }

    /// Remove the item at 1-based `index`, returning it.
    pub fn remove(&mut self, index: usize) -> Result<String, ListError> {
        let pos = self.position(index)?;
        Ok(self.items.remove(pos))
    }

    /// Render as `"{title}: (empty)"` or a title line plus numbered items.
    pub fn render(&self) -> String {
        let title = self.kind.title();
        if self.items.is_empty() {
            return format!("{title}: (empty)");
        }

        let mut out = format!("{title}:");
        for (i, item) in self.items.iter().enumerate() {
            out.push('\n');
            out.push_str(&format!("{}. {item}", i + 1));
        }
        out
    }

    fn position(&self, index: usize) -> Result<usize, ListError> {
        if index == 0 || index > self.items.len() {
            return Err(ListError::OutOfRange {
                index,
                len: self.items.len(),
            });
        }
        Ok(index - 1)
    }
}

/// In-memory store of every named list. Lives for the process lifetime.
#[derive(Clone, Debug)]
pub struct ListStore {
    lists: [NamedList; 2],
}

impl Default for ListStore {
    fn default() -> Self {
        Self {
            lists: ListKind::ALL.map(NamedList::new),
        }
    }
}

impl ListStore {
    /// Store with the stock entries a fresh bot starts with.
    pub fn seeded() -> Self {
        Self::default()
            .with_items(ListKind::Books, ["Harry Potter", "The Lord of the Rings"])
            .with_items(ListKind::Products, ["Laptop", "Smartphone"])
    }

    /// Append `items` to the `kind` list.
    pub fn with_items<I, S>(mut self, kind: ListKind, items: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let list = self.get_mut(kind);
        for item in items {
            list.append(item);
        }
        self
    }

    pub fn get(&self, kind: ListKind) -> &NamedList {
        &self.lists[kind.slot()]
    }

    pub fn get_mut(&mut self, kind: ListKind) -> &mut NamedList {
        &mut self.lists[kind.slot()]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entity_resolution_is_case_insensitive() {
        assert_eq!(ListKind::from_entity("book"), Some(ListKind::Books));
        assert_eq!(ListKind::from_entity("BOOKS"), Some(ListKind::Books));
        assert_eq!(ListKind::from_entity("Product"), Some(ListKind::Products));
        assert_eq!(ListKind::from_entity("products"), Some(ListKind::Products));
        assert_eq!(ListKind::from_entity("movies"), None);
        assert_eq!(ListKind::from_entity(""), None);
    }

    #[test]
    fn replace_and_remove_use_one_based_indices() {
        let mut list = NamedList::new(ListKind::Products);
        list.append("Laptop");
        list.append("Phone");

        assert_eq!(list.replace(1, "Tablet").unwrap(), "Laptop");
        assert_eq!(list.items(), ["Tablet", "Phone"]);

        assert_eq!(list.remove(2).unwrap(), "Phone");
        assert_eq!(list.items(), ["Tablet"]);
    }

    #[test]
    fn out_of_range_leaves_list_untouched() {
        let mut list = NamedList::new(ListKind::Books);
        list.append("Dune");

        assert_eq!(
            list.remove(0),
            Err(ListError::OutOfRange { index: 0, len: 1 })
        );
        assert_eq!(
            list.replace(2, "x"),
            Err(ListError::OutOfRange { index: 2, len: 1 })
        );
        assert_eq!(list.items(), ["Dune"]);
    }

    #[test]
    fn renders_empty_marker_and_numbered_lines() {
        let mut list = NamedList::new(ListKind::Books);
        assert_eq!(list.render(), "📚 Books: (empty)");

        list.append("Dune");
        list.append("Emma");
        assert_eq!(list.render(), "📚 Books:\n1. Dune\n2. Emma");
    }

    #[test]
    fn seeded_store_has_both_lists() {
        let store = ListStore::seeded();
        assert_eq!(store.get(ListKind::Books).len(), 2);
        assert_eq!(
            store.get(ListKind::Products).items(),
            ["Laptop", "Smartphone"]
        );

        let empty = ListStore::default();
        assert!(empty.get(ListKind::Books).is_empty());
        assert!(empty.get(ListKind::Products).is_empty());
    }
}
