use chrono::{DateTime, TimeDelta, Utc};
use std::fmt;

/// Number of child nodes reporting through the parent.
pub const CHILD_COUNT: u8 = 3;
const NODE_COUNT: usize = 1 + CHILD_COUNT as usize;

/// A microcontroller on the pod: the parent wired to the serial link, or one
/// of its children (ids `1..=CHILD_COUNT`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Node {
    Parent,
    Child(u8),
}

impl Node {
    pub const ALL: [Node; NODE_COUNT] =
        [Node::Parent, Node::Child(1), Node::Child(2), Node::Child(3)];

    /// The child with the given id, if it is one the station tracks.
    pub fn child(id: u8) -> Option<Node> {
        (1..=CHILD_COUNT).contains(&id).then_some(Node::Child(id))
    }

    fn index(self) -> Option<usize> {
        match self {
            Node::Parent => Some(0),
            Node::Child(id) if (1..=CHILD_COUNT).contains(&id) => Some(usize::from(id)),
            Node::Child(_) => None,
        }
    }
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Node::Parent => f.write_str("parent"),
            Node::Child(id) => write!(f, "{}", id),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Link {
    Online,
    Offline,
}

impl fmt::Display for Link {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Link::Online => f.write_str("Online"),
            Link::Offline => f.write_str("Disconnected"),
        }
    }
}

/// The outcome of evaluating one node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeReport {
    pub node: Node,
    pub link: Link,
    pub last_seen: String,
}

/// Last-seen bookkeeping for the parent and its children.
#[derive(Debug, Clone)]
pub struct Liveness {
    timeout: TimeDelta,
    last_seen: [Option<DateTime<Utc>>; NODE_COUNT],
}

impl Liveness {
    pub fn new(timeout: TimeDelta) -> Self {
        Self {
            timeout,
            last_seen: [None; NODE_COUNT],
        }
    }

    pub fn timeout(&self) -> TimeDelta {
        self.timeout
    }

    /// Records that `node` was heard from at `now`. Children outside the
    /// tracked range are ignored.
    pub fn touch(&mut self, node: Node, now: DateTime<Utc>) {
        if let Some(index) = node.index() {
            self.last_seen[index] = Some(now);
        }
    }

    pub fn last_seen(&self, node: Node) -> Option<DateTime<Utc>> {
        node.index().and_then(|index| self.last_seen[index])
    }

    /// Whether `node` was heard from no longer than the timeout before `now`.
    pub fn is_alive(&self, node: Node, now: DateTime<Utc>) -> bool {
        self.last_seen(node)
            .is_some_and(|seen| now.signed_duration_since(seen) <= self.timeout)
    }

    pub fn evaluate(&self, now: DateTime<Utc>) -> Vec<NodeReport> {
        Node::ALL
            .iter()
            .map(|&node| NodeReport {
                node,
                link: if self.is_alive(node, now) {
                    Link::Online
                } else {
                    Link::Offline
                },
                last_seen: match self.last_seen(node) {
                    Some(seen) => since_text(now.signed_duration_since(seen)),
                    None => "never".to_string(),
                },
            })
            .collect()
    }
}

/// Coarse "time since last seen" text.
pub fn since_text(elapsed: TimeDelta) -> String {
    fn plural(n: i64, unit: &str) -> String {
        if n == 1 {
            format!("1 {} ago", unit)
        } else {
            format!("{} {}s ago", n, unit)
        }
    }

    let seconds = elapsed.num_seconds();

    if seconds < 60 {
        "just now".to_string()
    } else if seconds < 60 * 60 {
        plural(elapsed.num_minutes(), "minute")
    } else if seconds < 24 * 60 * 60 {
        plural(elapsed.num_hours(), "hour")
    } else {
        plural(elapsed.num_days(), "day")
    }
}
