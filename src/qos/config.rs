use serde_json::Value;

/// A node of a structured configuration tree.
///
/// QoS builders only need to look up named children and read numbers,
/// so any tree-shaped format can be plugged in by implementing this
/// trait.
pub trait ConfigNode {
    /// The child named `name`, if present.
    fn child(&self, name: &str) -> Option<&dyn ConfigNode>;

    /// The node's value as a number, if it is one.
    fn scalar(&self) -> Option<f64>;
}

/// JSON objects have their members as children. Numbers, and strings
/// holding a number, are scalars.
impl ConfigNode for Value {
    fn child(&self, name: &str) -> Option<&dyn ConfigNode> {
        self.get(name).map(|v| v as &dyn ConfigNode)
    }

    fn scalar(&self) -> Option<f64> {
        match self {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }
}
