//! Fragment interface and an in-memory edge-cut implementation
//!
//! The engine only reads fragments. [`Fragment`] is the contract it consumes;
//! [`EdgeCutFragment`] is a compact CSR-backed implementation used to build
//! small partitioned graphs in memory.
//!
//! Local handle layout: inner vertices occupy `[0, ivnum)`, outer vertices
//! `[ivnum, ivnum + ovnum)`.

use std::collections::{BTreeSet, HashMap};

use super::error::BspError;
use super::vertex::{FragmentId, Gid, Vertex, VertexRange};

/// An adjacency entry: neighbour handle plus edge payload
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Edge<E> {
    pub neighbor: Vertex,
    pub data: E,
}

/// Read-only view of one partition of the graph
pub trait Fragment: Send + Sync {
    /// Edge payload type
    type EdgeData: Copy + Send + Sync;

    /// This fragment's id
    fn fid(&self) -> FragmentId;

    /// Total number of fragments
    fn fnum(&self) -> usize;

    /// Locally owned vertices
    fn inner_vertices(&self) -> VertexRange;

    /// Cached mirrors of vertices owned by other fragments
    fn outer_vertices(&self) -> VertexRange;

    /// All local handles, inner then outer
    fn vertices(&self) -> VertexRange {
        VertexRange::new(0, self.outer_vertices().end())
    }

    fn is_inner(&self, v: Vertex) -> bool {
        self.inner_vertices().contains(v)
    }

    fn is_outer(&self, v: Vertex) -> bool {
        self.outer_vertices().contains(v)
    }

    /// Outgoing adjacency of a local vertex
    fn outgoing_edges(&self, v: Vertex) -> &[Edge<Self::EdgeData>];

    /// Incoming adjacency of a local vertex
    fn incoming_edges(&self, v: Vertex) -> &[Edge<Self::EdgeData>];

    /// Global id of a local handle
    fn gid(&self, v: Vertex) -> Option<Gid>;

    /// Local handle of an owned vertex
    fn inner_vertex(&self, gid: Gid) -> Option<Vertex>;

    /// Local handle of a mirrored vertex
    fn outer_vertex(&self, gid: Gid) -> Option<Vertex>;

    /// Local handle of any vertex known to this fragment
    fn vertex(&self, gid: Gid) -> Option<Vertex> {
        self.inner_vertex(gid).or_else(|| self.outer_vertex(gid))
    }

    /// Fragment owning a local handle
    fn owner(&self, v: Vertex) -> Option<FragmentId>;
}

/// Default vertex-to-fragment assignment
///
/// # Panics
///
/// Panics if `fnum` is zero.
pub fn hash_partition(gid: Gid, fnum: usize) -> FragmentId {
    (gid % fnum as u64) as FragmentId
}

/// Compressed sparse rows over local handles
#[derive(Debug, Clone)]
struct Csr<E> {
    offsets: Vec<usize>,
    edges: Vec<Edge<E>>,
}

impl<E: Copy> Csr<E> {
    /// Build from `(source, edge)` pairs over `n` rows
    fn build(n: usize, mut entries: Vec<(usize, Edge<E>)>) -> Self {
        entries.sort_by_key(|(src, e)| (*src, e.neighbor));
        let mut offsets = vec![0usize; n + 1];
        for (src, _) in &entries {
            offsets[src + 1] += 1;
        }
        for i in 0..n {
            offsets[i + 1] += offsets[i];
        }
        let edges = entries.into_iter().map(|(_, e)| e).collect();
        Self { offsets, edges }
    }

    fn row(&self, v: Vertex) -> &[Edge<E>] {
        match (self.offsets.get(v.index()), self.offsets.get(v.index() + 1)) {
            (Some(&lo), Some(&hi)) => &self.edges[lo..hi],
            _ => &[],
        }
    }
}

/// Edge-cut fragment: every edge with at least one owned endpoint is stored,
/// non-owned endpoints become outer vertices.
#[derive(Debug, Clone)]
pub struct EdgeCutFragment<E> {
    fid: FragmentId,
    fnum: usize,
    ivnum: usize,
    gids: Vec<Gid>,
    inner_index: HashMap<Gid, Vertex>,
    outer_index: HashMap<Gid, Vertex>,
    outer_owner: Vec<FragmentId>,
    outgoing: Csr<E>,
    incoming: Csr<E>,
}

impl<E: Copy + Send + Sync> EdgeCutFragment<E> {
    /// Partition a directed graph into `fnum` fragments.
    ///
    /// The vertex set is `vertices` plus every edge endpoint. `assign` maps
    /// each global id to its owning fragment. Local handles are ordered by
    /// global id within the inner and outer ranges.
    pub fn partition(
        fnum: usize,
        vertices: impl IntoIterator<Item = Gid>,
        edges: &[(Gid, Gid, E)],
        assign: impl Fn(Gid) -> FragmentId,
    ) -> Result<Vec<Self>, BspError> {
        if fnum == 0 {
            return Err(BspError::config("fnum must be at least 1"));
        }

        let mut all: BTreeSet<Gid> = vertices.into_iter().collect();
        for &(src, dst, _) in edges {
            all.insert(src);
            all.insert(dst);
        }

        let mut owner = HashMap::with_capacity(all.len());
        let mut inner: Vec<Vec<Gid>> = vec![Vec::new(); fnum];
        for &gid in &all {
            let fid = assign(gid);
            if fid >= fnum {
                return Err(BspError::UnknownFragment { fid, fnum });
            }
            owner.insert(gid, fid);
            inner[fid].push(gid);
        }

        let mut outer: Vec<BTreeSet<Gid>> = vec![BTreeSet::new(); fnum];
        for &(src, dst, _) in edges {
            let (fs, fd) = (owner[&src], owner[&dst]);
            if fs != fd {
                outer[fs].insert(dst);
                outer[fd].insert(src);
            }
        }

        let fragments = inner
            .into_iter()
            .zip(outer)
            .enumerate()
            .map(|(fid, (inner, outer))| Self::build(fid, fnum, inner, outer, &owner, edges))
            .collect();

        tracing::debug!(fnum, vertices = all.len(), edges = edges.len(), "Partitioned graph");
        Ok(fragments)
    }

    fn build(
        fid: FragmentId,
        fnum: usize,
        inner: Vec<Gid>,
        outer: BTreeSet<Gid>,
        owner: &HashMap<Gid, FragmentId>,
        edges: &[(Gid, Gid, E)],
    ) -> Self {
        let ivnum = inner.len();
        let mut gids = inner;
        gids.extend(outer);

        let inner_index: HashMap<Gid, Vertex> =
            gids[..ivnum].iter().enumerate().map(|(i, &g)| (g, Vertex::new(i))).collect();
        let outer_index: HashMap<Gid, Vertex> = gids[ivnum..]
            .iter()
            .enumerate()
            .map(|(i, &g)| (g, Vertex::new(ivnum + i)))
            .collect();
        let outer_owner = gids[ivnum..].iter().map(|g| owner[g]).collect();

        let local = |g: &Gid| inner_index.get(g).or_else(|| outer_index.get(g)).copied();

        let mut out_entries = Vec::new();
        let mut in_entries = Vec::new();
        for (src, dst, data) in edges {
            if owner[src] != fid && owner[dst] != fid {
                continue;
            }
            if let (Some(s), Some(d)) = (local(src), local(dst)) {
                out_entries.push((s.index(), Edge { neighbor: d, data: *data }));
                in_entries.push((d.index(), Edge { neighbor: s, data: *data }));
            }
        }

        let n = gids.len();
        Self {
            fid,
            fnum,
            ivnum,
            gids,
            inner_index,
            outer_index,
            outer_owner,
            outgoing: Csr::build(n, out_entries),
            incoming: Csr::build(n, in_entries),
        }
    }

    /// Number of owned vertices
    pub fn inner_vertices_num(&self) -> usize {
        self.ivnum
    }

    /// Number of mirrored vertices
    pub fn outer_vertices_num(&self) -> usize {
        self.gids.len() - self.ivnum
    }
}

impl<E: Copy + Send + Sync> Fragment for EdgeCutFragment<E> {
    type EdgeData = E;

    fn fid(&self) -> FragmentId {
        self.fid
    }

    fn fnum(&self) -> usize {
        self.fnum
    }

    fn inner_vertices(&self) -> VertexRange {
        VertexRange::new(0, self.ivnum)
    }

    fn outer_vertices(&self) -> VertexRange {
        VertexRange::new(self.ivnum, self.gids.len())
    }

    fn outgoing_edges(&self, v: Vertex) -> &[Edge<E>] {
        self.outgoing.row(v)
    }

    fn incoming_edges(&self, v: Vertex) -> &[Edge<E>] {
        self.incoming.row(v)
    }

    fn gid(&self, v: Vertex) -> Option<Gid> {
        self.gids.get(v.index()).copied()
    }

    fn inner_vertex(&self, gid: Gid) -> Option<Vertex> {
        self.inner_index.get(&gid).copied()
    }

    fn outer_vertex(&self, gid: Gid) -> Option<Vertex> {
        self.outer_index.get(&gid).copied()
    }

    fn owner(&self, v: Vertex) -> Option<FragmentId> {
        if self.is_inner(v) {
            Some(self.fid)
        } else {
            self.outer_owner.get(v.index().checked_sub(self.ivnum)?).copied()
        }
    }
}
