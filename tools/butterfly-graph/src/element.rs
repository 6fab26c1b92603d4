//! Typed OSM elements as handed to the pass handlers

pub use butterfly_common::ElementKind;

/// Free-form key/value tags of an element, in input order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Tags(Vec<(String, String)>);

impl Tags {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn has(&self, key: &str) -> bool {
        self.0.iter().any(|(k, _)| k == key)
    }

    pub fn has_tag(&self, key: &str, value: &str) -> bool {
        self.get(key) == Some(value)
    }

    /// Set a tag, replacing an existing value for the same key
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let value = value.into();
        match self.0.iter_mut().find(|(k, _)| *k == key) {
            Some(entry) => entry.1 = value,
            None => self.0.push((key, value)),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Tags {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut tags = Tags::new();
        for (k, v) in iter {
            tags.insert(k, v);
        }
        tags
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ReaderNode {
    pub id: i64,
    pub lat: f64,
    pub lon: f64,
    pub tags: Tags,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ReaderWay {
    pub id: i64,
    pub nodes: Vec<i64>,
    pub tags: Tags,
}

impl ReaderWay {
    /// First and last node reference, if the way has at least one node
    pub fn end_nodes(&self) -> Option<(i64, i64)> {
        Some((*self.nodes.first()?, *self.nodes.last()?))
    }

    /// True when the way starts and ends at the same node
    pub fn is_closed(&self) -> bool {
        self.nodes.len() > 2 && self.nodes.first() == self.nodes.last()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemberKind {
    Node = 0,
    Way = 1,
    Relation = 2,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Member {
    pub role: String,
    pub kind: MemberKind,
    pub ref_id: i64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReaderRelation {
    pub id: i64,
    pub members: Vec<Member>,
    pub tags: Tags,
}

impl ReaderRelation {
    /// Relations with relation members are not used for routing
    pub fn is_meta_relation(&self) -> bool {
        self.members.iter().any(|m| m.kind == MemberKind::Relation)
    }

    pub fn way_members(&self) -> impl Iterator<Item = &Member> {
        self.members.iter().filter(|m| m.kind == MemberKind::Way)
    }
}

/// One element of the input stream
#[derive(Debug, Clone, PartialEq)]
pub enum Element {
    /// File header; the timestamp is kept in its textual RFC 3339 form
    Header { timestamp: Option<String> },
    Node(ReaderNode),
    Way(ReaderWay),
    Relation(ReaderRelation),
}

impl Element {
    pub fn kind(&self) -> ElementKind {
        match self {
            Element::Header { .. } => ElementKind::Header,
            Element::Node(_) => ElementKind::Node,
            Element::Way(_) => ElementKind::Way,
            Element::Relation(_) => ElementKind::Relation,
        }
    }

    pub fn id(&self) -> Option<i64> {
        match self {
            Element::Header { .. } => None,
            Element::Node(n) => Some(n.id),
            Element::Way(w) => Some(w.id),
            Element::Relation(r) => Some(r.id),
        }
    }
}
