// Reading cortical surface meshes from FreeSurfer binary 'surf' files.
// These files store a triangular mesh, where each vertex is an x,y,z coord in
// world (RAS) space and each face is defined by 3 indices into the vertices.
// Only the vertex positions matter for voxelization.

use byteordered::ByteOrdered;
use flate2::bufread::GzDecoder;

use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use crate::error::{Result, RibbonQcError};
use crate::util::is_gz_file;

pub const TRIS_MAGIC_FILE_TYPE_NUMBER: i32 = 16777214;

/// A triangulated brain surface mesh in world coordinates.
///
/// Vertices are stored as consecutive x,y,z triples, faces as consecutive
/// index triples, as laid out in the file.
#[derive(Debug, Clone, PartialEq)]
pub struct SurfaceMesh {
    pub vertices: Vec<f32>,
    pub faces: Vec<i32>,
}

impl SurfaceMesh {
    /// Build a mesh from raw vertex coordinates (x,y,z triples).
    pub fn from_vertices(vertices: Vec<f32>) -> SurfaceMesh {
        assert_eq!(
            vertices.len() % 3,
            0,
            "vertex coordinates must come in x,y,z triples"
        );
        SurfaceMesh {
            vertices,
            faces: Vec::new(),
        }
    }

    pub fn num_vertices(&self) -> usize {
        self.vertices.len() / 3
    }

    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty()
    }

    /// Iterate vertex coordinates as [x, y, z] triples.
    pub fn vertex_iter(&self) -> impl Iterator<Item = [f32; 3]> + '_ {
        self.vertices
            .chunks_exact(3)
            .map(|c| [c[0], c[1], c[2]])
    }

    /// Whether every vertex coordinate is finite.
    pub fn is_finite(&self) -> bool {
        self.vertices.iter().all(|v| v.is_finite())
    }
}

/// Interpret three bytes as a single 24 bit integer, FreeSurfer style.
fn interpret_fs_int24(b1: u8, b2: u8, b3: u8) -> i32 {
    ((b1 as i32) << 16) + ((b2 as i32) << 8) + b3 as i32
}

/// Read a surface mesh from a FreeSurfer surf file.
///
/// If the file's name ends with ".gz", the file is assumed to need GZip
/// decoding; plain surf files are read directly.
pub fn read_surface<P: AsRef<Path>>(path: P) -> Result<SurfaceMesh> {
    let gz = is_gz_file(&path);
    let file = BufReader::new(File::open(path)?);
    if gz {
        let mut decoder = GzDecoder::new(file);
        read_surface_from(&mut decoder)
    } else {
        let mut file = file;
        read_surface_from(&mut file)
    }
}

/// Read a surface mesh from the given byte stream.
pub fn read_surface_from<S>(input: &mut S) -> Result<SurfaceMesh>
where
    S: Read,
{
    let mut input = ByteOrdered::be(input);

    let magic = interpret_fs_int24(input.read_u8()?, input.read_u8()?, input.read_u8()?);
    if magic != TRIS_MAGIC_FILE_TYPE_NUMBER {
        return Err(RibbonQcError::InvalidSurfaceFormat);
    }

    // The creation info line is terminated by two consecutive newlines.
    let mut prev = 0u8;
    loop {
        let cur = input.read_u8()?;
        if prev == b'\n' && cur == b'\n' {
            break;
        }
        prev = cur;
    }

    let num_vertices = input.read_i32()?;
    let num_faces = input.read_i32()?;
    if num_vertices < 0 || num_faces < 0 {
        return Err(RibbonQcError::InvalidSurfaceFormat);
    }

    let mut vertices: Vec<f32> = Vec::with_capacity(num_vertices as usize * 3);
    for _ in 0..num_vertices * 3 {
        vertices.push(input.read_f32()?);
    }

    let mut faces: Vec<i32> = Vec::with_capacity(num_faces as usize * 3);
    for _ in 0..num_faces * 3 {
        faces.push(input.read_i32()?);
    }

    Ok(SurfaceMesh { vertices, faces })
}
