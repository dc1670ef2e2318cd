//! Compressed adjacency lists.

use itertools::Itertools;

/// An adjacency list in compressed row format.
///
/// Node `i` links to `array()[offsets()[i]..offsets()[i + 1]]`. Collision queries return
/// one node per query point (or per entity) with the colliding entities as links.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AdjacencyList<T> {
    data: Vec<T>,
    offsets: Vec<usize>,
}

impl<T> AdjacencyList<T> {
    /// Create an adjacency list from flat data and offsets.
    ///
    /// `offsets` must start with zero, be non-decreasing and end with `data.len()`.
    pub fn new(data: Vec<T>, offsets: Vec<usize>) -> Self {
        assert_eq!(offsets.first(), Some(&0), "Offsets must start at zero.");
        assert_eq!(
            offsets.last(),
            Some(&data.len()),
            "Last offset must equal the data length."
        );
        debug_assert!(offsets.iter().tuple_windows().all(|(a, b)| a <= b));

        Self { data, offsets }
    }

    /// Create an adjacency list from one vector of links per node.
    pub fn from_nested(nested: Vec<Vec<T>>) -> Self {
        let mut offsets = Vec::with_capacity(nested.len() + 1);
        offsets.push(0);
        for links in &nested {
            offsets.push(offsets[offsets.len() - 1] + links.len());
        }
        let data = nested.into_iter().flatten().collect_vec();

        Self { data, offsets }
    }

    /// Number of nodes.
    pub fn num_nodes(&self) -> usize {
        self.offsets.len() - 1
    }

    /// Links of node `node`.
    pub fn links(&self, node: usize) -> &[T] {
        &self.data[self.offsets[node]..self.offsets[node + 1]]
    }

    /// Number of links of node `node`.
    pub fn num_links(&self, node: usize) -> usize {
        self.offsets[node + 1] - self.offsets[node]
    }

    /// All links, node after node.
    pub fn array(&self) -> &[T] {
        &self.data
    }

    /// Offsets into [AdjacencyList::array].
    pub fn offsets(&self) -> &[usize] {
        &self.offsets
    }

    /// Iterate over the links of all nodes.
    pub fn iter(&self) -> impl Iterator<Item = &[T]> + '_ {
        self.offsets
            .iter()
            .tuple_windows()
            .map(|(&start, &end)| &self.data[start..end])
    }
}

impl<T: std::fmt::Display> std::fmt::Display for AdjacencyList<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for (node, links) in self.iter().enumerate() {
            writeln!(f, "{}: [{}]", node, links.iter().join(", "))?;
        }
        Ok(())
    }
}
