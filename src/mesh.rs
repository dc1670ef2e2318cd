//! Mesh interface used by the tree builders and queries.
//!
//! The trees only need a narrow view of a mesh: which geometry nodes make up an
//! entity, where those nodes are, and how many entities of each dimension exist. This
//! is captured by the [Mesh] trait. [StructuredMesh] is a serial implementation on
//! simple tensor-product domains.

use std::collections::{HashMap, HashSet};

use itertools::Itertools;

use crate::{
    error::{BBTreeError, Result},
    geometry::{midpoint, Point},
    graph::AdjacencyList,
};

/// Number of entities of one dimension on this process.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct EntityCounts {
    /// Entities owned by this process.
    pub owned: usize,
    /// Ghost entities, numbered after the owned ones.
    pub ghosts: usize,
}

impl EntityCounts {
    /// Number of owned and ghost entities.
    pub fn total(&self) -> usize {
        self.owned + self.ghosts
    }
}

/// Geometric view of a mesh.
pub trait Mesh {
    /// Topological dimension of the cells.
    fn tdim(&self) -> usize;

    /// Number of entities of dimension `dim`.
    ///
    /// Returns `None` if entities of that dimension have not been created.
    fn num_entities(&self, dim: usize) -> Option<EntityCounts>;

    /// Geometry node indices of an entity.
    ///
    /// # Panics
    /// If entities of dimension `dim` have not been created or `entity` is out of range.
    fn entity_geometry(&self, dim: usize, entity: usize) -> &[usize];

    /// Coordinates of all geometry nodes.
    fn coordinates(&self) -> &[Point];

    /// Geometry node indices for a list of entities.
    fn entities_to_geometry(&self, dim: usize, entities: &[usize]) -> Vec<&[usize]> {
        entities
            .iter()
            .map(|&entity| self.entity_geometry(dim, entity))
            .collect_vec()
    }

    /// Coordinates of the geometry nodes of an entity.
    fn entity_coordinates(&self, dim: usize, entity: usize) -> Vec<Point> {
        let x = self.coordinates();
        self.entity_geometry(dim, entity)
            .iter()
            .map(|&node| x[node])
            .collect_vec()
    }

    /// Mean of the node coordinates of an entity.
    fn entity_midpoint(&self, dim: usize, entity: usize) -> Point {
        midpoint(&self.entity_coordinates(dim, entity))
    }
}

/// Check that `dim` is a dimension with materialised entities and return their count.
pub(crate) fn checked_num_entities<M: Mesh>(mesh: &M, dim: usize) -> Result<usize> {
    let tdim = mesh.tdim();
    if dim > tdim {
        return Err(BBTreeError::InvalidDimension { dim, tdim });
    }
    mesh.num_entities(dim)
        .map(|counts| counts.total())
        .ok_or(BBTreeError::InvalidDimension { dim, tdim })
}

/// Check that every entity index is below `num_entities`.
pub(crate) fn check_entities(entities: &[usize], num_entities: usize, dim: usize) -> Result<()> {
    match entities.iter().find(|&&entity| entity >= num_entities) {
        Some(&entity) => Err(BBTreeError::EntityOutOfRange {
            entity,
            num_entities,
            dim,
        }),
        None => Ok(()),
    }
}

/// Cell shapes supported by [StructuredMesh].
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum CellType {
    /// Point.
    Point,
    /// Interval.
    Interval,
    /// Triangle.
    Triangle,
    /// Quadrilateral with tensor-product vertex ordering.
    Quadrilateral,
    /// Tetrahedron.
    Tetrahedron,
    /// Hexahedron with tensor-product vertex ordering.
    Hexahedron,
}

impl CellType {
    /// Topological dimension.
    pub fn tdim(&self) -> usize {
        match self {
            CellType::Point => 0,
            CellType::Interval => 1,
            CellType::Triangle | CellType::Quadrilateral => 2,
            CellType::Tetrahedron | CellType::Hexahedron => 3,
        }
    }

    /// Number of vertices.
    pub fn num_vertices(&self) -> usize {
        match self {
            CellType::Point => 1,
            CellType::Interval => 2,
            CellType::Triangle => 3,
            CellType::Quadrilateral | CellType::Tetrahedron => 4,
            CellType::Hexahedron => 8,
        }
    }

    /// Shape of the facets.
    pub fn facet_type(&self) -> CellType {
        match self {
            CellType::Point | CellType::Interval => CellType::Point,
            CellType::Triangle | CellType::Quadrilateral => CellType::Interval,
            CellType::Tetrahedron => CellType::Triangle,
            CellType::Hexahedron => CellType::Quadrilateral,
        }
    }

    /// Local vertices of the sub-entities of dimension `dim`.
    pub fn sub_entities(&self, dim: usize) -> Vec<Vec<usize>> {
        if dim == 0 {
            return (0..self.num_vertices()).map(|v| vec![v]).collect_vec();
        }
        if dim == self.tdim() {
            return vec![(0..self.num_vertices()).collect_vec()];
        }
        let table: &[&[usize]] = match (self, dim) {
            (CellType::Triangle, 1) => &[&[1, 2], &[0, 2], &[0, 1]],
            (CellType::Quadrilateral, 1) => &[&[0, 1], &[0, 2], &[1, 3], &[2, 3]],
            (CellType::Tetrahedron, 1) => &[&[2, 3], &[1, 3], &[1, 2], &[0, 3], &[0, 2], &[0, 1]],
            (CellType::Tetrahedron, 2) => &[&[1, 2, 3], &[0, 2, 3], &[0, 1, 3], &[0, 1, 2]],
            (CellType::Hexahedron, 1) => &[
                &[0, 1],
                &[0, 2],
                &[0, 4],
                &[1, 3],
                &[1, 5],
                &[2, 3],
                &[2, 6],
                &[3, 7],
                &[4, 5],
                &[4, 6],
                &[5, 7],
                &[6, 7],
            ],
            (CellType::Hexahedron, 2) => &[
                &[0, 1, 2, 3],
                &[0, 1, 4, 5],
                &[0, 2, 4, 6],
                &[1, 3, 5, 7],
                &[2, 3, 6, 7],
                &[4, 5, 6, 7],
            ],
            _ => &[],
        };
        table.iter().map(|entity| entity.to_vec()).collect_vec()
    }
}

/// A serial mesh of an interval, rectangle or box.
///
/// Vertices and cells exist after construction. Edges and facets are created on
/// request with [StructuredMesh::create_entities]. Geometry nodes and vertices
/// coincide, so an entity's vertex list is also its geometry.
#[derive(Clone, Debug)]
pub struct StructuredMesh {
    cell_type: CellType,
    coordinates: Vec<Point>,
    // Vertices of the entities of each dimension.
    entities: Vec<Option<AdjacencyList<usize>>>,
    // Entities of each dimension attached to each cell.
    cell_entities: Vec<Option<AdjacencyList<usize>>>,
}

impl StructuredMesh {
    fn from_cells(cell_type: CellType, coordinates: Vec<Point>, cells: Vec<Vec<usize>>) -> Self {
        let tdim = cell_type.tdim();
        let num_vertices = coordinates.len();

        let mut entities = vec![None; tdim + 1];
        let mut cell_entities = vec![None; tdim + 1];

        entities[0] = Some(AdjacencyList::from_nested(
            (0..num_vertices).map(|v| vec![v]).collect_vec(),
        ));
        cell_entities[0] = Some(AdjacencyList::from_nested(cells.clone()));

        let num_cells = cells.len();
        entities[tdim] = Some(AdjacencyList::from_nested(cells));
        cell_entities[tdim] = Some(AdjacencyList::from_nested(
            (0..num_cells).map(|c| vec![c]).collect_vec(),
        ));

        Self {
            cell_type,
            coordinates,
            entities,
            cell_entities,
        }
    }

    /// Mesh of the unit interval with `n` cells.
    pub fn unit_interval(n: usize) -> Self {
        Self::create_interval([0.0, 1.0], n)
    }

    /// Mesh of the interval `[a, b]` with `n` cells.
    pub fn create_interval(interval: [f64; 2], n: usize) -> Self {
        assert!(n > 0, "Need at least one cell.");
        let [a, b] = interval;
        let coordinates = (0..=n)
            .map(|i| [a + (b - a) * i as f64 / n as f64, 0.0, 0.0])
            .collect_vec();
        let cells = (0..n).map(|i| vec![i, i + 1]).collect_vec();

        Self::from_cells(CellType::Interval, coordinates, cells)
    }

    /// Mesh of the unit square with `nx * ny` squares, each split into two triangles or
    /// kept as a quadrilateral.
    pub fn unit_square(nx: usize, ny: usize, cell_type: CellType) -> Self {
        Self::create_rectangle([[0.0, 0.0], [1.0, 1.0]], [nx, ny], cell_type)
    }

    /// Mesh of the rectangle spanned by two corners.
    pub fn create_rectangle(corners: [[f64; 2]; 2], n: [usize; 2], cell_type: CellType) -> Self {
        let [nx, ny] = n;
        assert!(nx > 0 && ny > 0, "Need at least one cell per direction.");
        let [[x0, y0], [x1, y1]] = corners;

        let mut coordinates = Vec::with_capacity((nx + 1) * (ny + 1));
        for j in 0..=ny {
            for i in 0..=nx {
                coordinates.push([
                    x0 + (x1 - x0) * i as f64 / nx as f64,
                    y0 + (y1 - y0) * j as f64 / ny as f64,
                    0.0,
                ]);
            }
        }

        let vertex = |i: usize, j: usize| j * (nx + 1) + i;

        let mut cells = Vec::new();
        for j in 0..ny {
            for i in 0..nx {
                let v = [
                    vertex(i, j),
                    vertex(i + 1, j),
                    vertex(i, j + 1),
                    vertex(i + 1, j + 1),
                ];
                match cell_type {
                    CellType::Triangle => {
                        cells.push(vec![v[0], v[1], v[3]]);
                        cells.push(vec![v[0], v[2], v[3]]);
                    }
                    CellType::Quadrilateral => cells.push(v.to_vec()),
                    _ => panic!("Unsupported cell type {:?} for a rectangle.", cell_type),
                }
            }
        }

        Self::from_cells(cell_type, coordinates, cells)
    }

    /// Mesh of the unit cube.
    pub fn unit_cube(nx: usize, ny: usize, nz: usize, cell_type: CellType) -> Self {
        Self::create_box([[0.0; 3], [1.0; 3]], [nx, ny, nz], cell_type)
    }

    /// Mesh of the box spanned by two corners. Each sub-box is split into six
    /// tetrahedra sharing its main diagonal, or kept as a hexahedron.
    pub fn create_box(corners: [Point; 2], n: [usize; 3], cell_type: CellType) -> Self {
        let [nx, ny, nz] = n;
        assert!(
            nx > 0 && ny > 0 && nz > 0,
            "Need at least one cell per direction."
        );
        let [p0, p1] = corners;

        let mut coordinates = Vec::with_capacity((nx + 1) * (ny + 1) * (nz + 1));
        for k in 0..=nz {
            for j in 0..=ny {
                for i in 0..=nx {
                    coordinates.push([
                        p0[0] + (p1[0] - p0[0]) * i as f64 / nx as f64,
                        p0[1] + (p1[1] - p0[1]) * j as f64 / ny as f64,
                        p0[2] + (p1[2] - p0[2]) * k as f64 / nz as f64,
                    ]);
                }
            }
        }

        let vertex = |i: usize, j: usize, k: usize| (k * (ny + 1) + j) * (nx + 1) + i;

        let mut cells = Vec::new();
        for k in 0..nz {
            for j in 0..ny {
                for i in 0..nx {
                    // Local vertex b sits at offset (b & 1, (b >> 1) & 1, (b >> 2) & 1).
                    let v: [usize; 8] =
                        std::array::from_fn(|b| vertex(i + (b & 1), j + ((b >> 1) & 1), k + (b >> 2)));
                    match cell_type {
                        CellType::Tetrahedron => {
                            for path in [[1, 3], [1, 5], [4, 5], [2, 3], [4, 6], [2, 6]] {
                                cells.push(vec![v[0], v[path[0]], v[path[1]], v[7]]);
                            }
                        }
                        CellType::Hexahedron => cells.push(v.to_vec()),
                        _ => panic!("Unsupported cell type {:?} for a box.", cell_type),
                    }
                }
            }
        }

        Self::from_cells(cell_type, coordinates, cells)
    }

    /// Cell type of the mesh.
    pub fn cell_type(&self) -> CellType {
        self.cell_type
    }

    /// Shift all coordinates by `offset`.
    ///
    /// Bounding box trees built before are not updated and must be rebuilt.
    pub fn translate(&mut self, offset: Point) {
        for point in self.coordinates.iter_mut() {
            for (x, dx) in point.iter_mut().zip(offset) {
                *x += dx;
            }
        }
    }

    /// Create the entities of dimension `dim`. Does nothing if they already exist.
    pub fn create_entities(&mut self, dim: usize) -> Result<()> {
        let tdim = self.cell_type.tdim();
        if dim > tdim {
            return Err(BBTreeError::InvalidDimension { dim, tdim });
        }
        if self.entities[dim].is_some() {
            return Ok(());
        }

        let cells = self.cells();
        let templates = self.cell_type.sub_entities(dim);

        let mut entity_index = HashMap::<Vec<usize>, usize>::new();
        let mut entity_vertices = Vec::<Vec<usize>>::new();
        let mut cell_to_entity = Vec::with_capacity(cells.num_nodes());

        for cell in cells.iter() {
            let mut local = Vec::with_capacity(templates.len());
            for template in &templates {
                let vertices = template.iter().map(|&v| cell[v]).collect_vec();
                let key = vertices.iter().copied().sorted_unstable().collect_vec();
                let index = *entity_index.entry(key).or_insert_with(|| {
                    entity_vertices.push(vertices);
                    entity_vertices.len() - 1
                });
                local.push(index);
            }
            cell_to_entity.push(local);
        }

        self.entities[dim] = Some(AdjacencyList::from_nested(entity_vertices));
        self.cell_entities[dim] = Some(AdjacencyList::from_nested(cell_to_entity));

        Ok(())
    }

    fn cells(&self) -> AdjacencyList<usize> {
        match &self.entities[self.cell_type.tdim()] {
            Some(cells) => cells.clone(),
            None => unreachable!("Cells are created on construction."),
        }
    }

    /// For each entity of dimension `dim`, the cells it belongs to.
    pub fn entity_to_cells(&self, dim: usize) -> Result<AdjacencyList<usize>> {
        let num_entities = checked_num_entities(self, dim)?;
        let tdim = self.cell_type.tdim();
        let cell_entities = self.cell_entities[dim]
            .as_ref()
            .ok_or(BBTreeError::InvalidDimension { dim, tdim })?;

        let mut connectivity = vec![Vec::new(); num_entities];
        for (cell, entities) in cell_entities.iter().enumerate() {
            for &entity in entities {
                connectivity[entity].push(cell);
            }
        }

        Ok(AdjacencyList::from_nested(connectivity))
    }

    /// Facets that belong to exactly one cell. Creates the facets if necessary.
    pub fn exterior_facet_indices(&mut self) -> Result<Vec<usize>> {
        let tdim = self.cell_type.tdim();
        if tdim == 0 {
            return Ok(Vec::new());
        }
        self.create_entities(tdim - 1)?;
        let facet_to_cells = self.entity_to_cells(tdim - 1)?;

        Ok((0..facet_to_cells.num_nodes())
            .filter(|&facet| facet_to_cells.num_links(facet) == 1)
            .collect_vec())
    }

    /// Entities of dimension `dim` whose vertices all satisfy `marker`.
    pub fn locate_entities<F: Fn(&Point) -> bool>(&self, dim: usize, marker: F) -> Result<Vec<usize>> {
        let num_entities = checked_num_entities(self, dim)?;
        let marked = self.coordinates.iter().map(&marker).collect_vec();

        Ok((0..num_entities)
            .filter(|&entity| {
                self.entity_geometry(dim, entity)
                    .iter()
                    .all(|&v| marked[v])
            })
            .collect_vec())
    }

    /// Entities of dimension `dim` on the boundary whose vertices all satisfy `marker`.
    ///
    /// An entity is on the boundary if it is a sub-entity of an exterior facet.
    pub fn locate_entities_boundary<F: Fn(&Point) -> bool>(
        &mut self,
        dim: usize,
        marker: F,
    ) -> Result<Vec<usize>> {
        let tdim = self.cell_type.tdim();
        if dim >= tdim {
            return Err(BBTreeError::InvalidDimension { dim, tdim });
        }
        let exterior_facets = self.exterior_facet_indices()?;
        self.create_entities(dim)?;

        let facet_templates = self.cell_type.facet_type().sub_entities(dim);
        let mut boundary = HashSet::<Vec<usize>>::new();
        for &facet in &exterior_facets {
            let vertices = self.entity_geometry(tdim - 1, facet);
            for template in &facet_templates {
                boundary.insert(template.iter().map(|&v| vertices[v]).sorted_unstable().collect_vec());
            }
        }

        Ok(self
            .locate_entities(dim, marker)?
            .into_iter()
            .filter(|&entity| {
                let key = self
                    .entity_geometry(dim, entity)
                    .iter()
                    .copied()
                    .sorted_unstable()
                    .collect_vec();
                boundary.contains(&key)
            })
            .collect_vec())
    }
}

impl Mesh for StructuredMesh {
    fn tdim(&self) -> usize {
        self.cell_type.tdim()
    }

    fn num_entities(&self, dim: usize) -> Option<EntityCounts> {
        self.entities
            .get(dim)?
            .as_ref()
            .map(|entities| EntityCounts {
                owned: entities.num_nodes(),
                ghosts: 0,
            })
    }

    fn entity_geometry(&self, dim: usize, entity: usize) -> &[usize] {
        match &self.entities[dim] {
            Some(entities) => entities.links(entity),
            None => panic!("Entities of dimension {} have not been created.", dim),
        }
    }

    fn coordinates(&self) -> &[Point] {
        &self.coordinates
    }
}

#[cfg(test)]
mod test {
    use super::{CellType, Mesh, StructuredMesh};
    use crate::error::BBTreeError;

    #[test]
    fn test_entity_counts() {
        let mut mesh = StructuredMesh::unit_cube(2, 2, 2, CellType::Tetrahedron);
        assert_eq!(mesh.num_entities(0).map(|c| c.total()), Some(27));
        assert_eq!(mesh.num_entities(3).map(|c| c.total()), Some(48));
        assert!(mesh.num_entities(1).is_none());

        mesh.create_entities(2).unwrap();
        // Every interior face is shared by two tets, every boundary face by one.
        let exterior = mesh.exterior_facet_indices().unwrap();
        let num_faces = mesh.num_entities(2).unwrap().total();
        assert_eq!(exterior.len(), 6 * 2 * 2 * 2);
        assert_eq!(2 * num_faces - exterior.len(), 4 * 48);

        let mut hex = StructuredMesh::unit_cube(3, 3, 3, CellType::Hexahedron);
        hex.create_entities(1).unwrap();
        assert_eq!(hex.num_entities(1).unwrap().total(), 3 * 3 * 4 * 4);
        assert_eq!(hex.exterior_facet_indices().unwrap().len(), 6 * 9);
    }

    #[test]
    fn test_square_edges() {
        let mut mesh = StructuredMesh::unit_square(3, 3, CellType::Triangle);
        mesh.create_entities(1).unwrap();
        // Horizontal, vertical and diagonal edges.
        assert_eq!(mesh.num_entities(1).unwrap().total(), 12 + 12 + 9);
        assert_eq!(mesh.exterior_facet_indices().unwrap().len(), 12);
    }

    #[test]
    fn test_invalid_dimension() {
        let mut mesh = StructuredMesh::unit_interval(4);
        assert_eq!(
            mesh.create_entities(2),
            Err(BBTreeError::InvalidDimension { dim: 2, tdim: 1 })
        );
    }

    #[test]
    fn test_locate_entities() {
        let mut mesh = StructuredMesh::unit_cube(4, 4, 4, CellType::Hexahedron);

        let left = mesh.locate_entities(3, |x| x[0] <= 0.5).unwrap();
        assert_eq!(left.len(), 32);

        let top = mesh
            .locate_entities_boundary(2, |x| (x[2] - 1.0).abs() < 1E-12)
            .unwrap();
        assert_eq!(top.len(), 16);

        // The boundary edges on the top surface.
        let top_edges = mesh
            .locate_entities_boundary(1, |x| (x[2] - 1.0).abs() < 1E-12)
            .unwrap();
        assert_eq!(top_edges.len(), 2 * 4 * 5);
    }

    #[test]
    fn test_entities_to_geometry() {
        let mesh = StructuredMesh::unit_square(2, 1, CellType::Quadrilateral);
        let geometry = mesh.entities_to_geometry(2, &[1, 0]);
        assert_eq!(geometry, vec![&[1, 2, 4, 5][..], &[0, 1, 3, 4][..]]);
        assert_eq!(
            mesh.entity_coordinates(2, 1),
            geometry[0].iter().map(|&v| mesh.coordinates()[v]).collect::<Vec<_>>()
        );
    }

    #[test]
    fn test_translate() {
        let mut mesh = StructuredMesh::unit_interval(2);
        mesh.translate([0.5, 0.0, 0.0]);
        assert_eq!(mesh.coordinates()[0], [0.5, 0.0, 0.0]);
        assert_eq!(mesh.entity_midpoint(1, 1), [1.25, 0.0, 0.0]);
    }
}
