//! Reading and writing brain volumes in FreeSurfer binary 'MGH' files.
//!
//! MGZ files (gzip-compressed MGH) are handled transparently based on the
//! file name. On read, all sample types are widened to f32 and the voxel
//! grid is combined with the header's RAS block into a [`Volume`]; 4D files
//! contribute their first frame only.

use byteordered::ByteOrdered;
use flate2::bufread::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use ndarray::{Array3, ShapeBuilder};

use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

use crate::affine::Affine4;
use crate::error::{Result, RibbonQcError};
use crate::util::is_gz_file;
use crate::volume::Volume;

pub const MGH_VERSION: i32 = 1;

pub const MGH_DTYPE_UCHAR: i32 = 0;
pub const MGH_DTYPE_INT: i32 = 1;
pub const MGH_DTYPE_FLOAT: i32 = 3;
pub const MGH_DTYPE_SHORT: i32 = 4;

/// The index in bytes where the data part starts in an MGH file.
pub const MGH_DATA_START: usize = 284;

/// Models the header of a FreeSurfer MGH file containing a brain volume.
#[derive(Debug, Clone, PartialEq)]
pub struct MghHeader {
    pub mgh_format_version: i32,
    pub dim1len: i32,
    pub dim2len: i32,
    pub dim3len: i32,
    pub num_frames: i32,
    pub dtype: i32,
    pub dof: i32,
    pub is_ras_good: i16,
    pub delta: [f32; 3],
    pub mdc_raw: [f32; 9],
    pub p_xyz_c: [f32; 3],
}

impl Default for MghHeader {
    fn default() -> MghHeader {
        MghHeader {
            mgh_format_version: MGH_VERSION,
            dim1len: 0,
            dim2len: 0,
            dim3len: 0,
            num_frames: 1,
            dtype: MGH_DTYPE_FLOAT,
            dof: 0,
            is_ras_good: 0,
            delta: [0.; 3],
            mdc_raw: [0.; 9],
            p_xyz_c: [0.; 3],
        }
    }
}

impl MghHeader {
    /// Read an MGH header from the given byte stream.
    ///
    /// Consumes exactly the header part of the file, i.e. the stream is left
    /// at the start of the voxel data.
    pub fn from_reader<S>(input: &mut S) -> Result<MghHeader>
    where
        S: Read,
    {
        let mut hdr = MghHeader::default();

        let mut input = ByteOrdered::be(input);

        hdr.mgh_format_version = input.read_i32()?;

        if hdr.mgh_format_version != MGH_VERSION {
            return Err(RibbonQcError::InvalidMghFormat);
        }

        hdr.dim1len = input.read_i32()?;
        hdr.dim2len = input.read_i32()?;
        hdr.dim3len = input.read_i32()?;
        hdr.num_frames = input.read_i32()?;

        hdr.dtype = input.read_i32()?;
        hdr.dof = input.read_i32()?;

        hdr.is_ras_good = input.read_i16()?;

        let mut consumed: usize = 30;
        if hdr.is_ras_good == 1 {
            for idx in 0..3 {
                hdr.delta[idx] = input.read_f32()?;
            }
            for idx in 0..9 {
                hdr.mdc_raw[idx] = input.read_f32()?;
            }
            for idx in 0..3 {
                hdr.p_xyz_c[idx] = input.read_f32()?;
            }
            consumed += 60;
        }

        // The header is padded up to the data start. GZ streams cannot seek,
        // so the padding is read and discarded.
        for _ in consumed..MGH_DATA_START {
            input.read_u8()?;
        }

        Ok(hdr)
    }

    /// The vox2ras affine encoded in the RAS block.
    ///
    /// The 9 direction-cosine floats are stored column by column; the linear
    /// part is Mdc * diag(delta) and the translation places the center voxel
    /// at the stored RAS point.
    pub fn vox2ras(&self) -> Affine4 {
        let mut rows = [[0.0f64; 4]; 4];
        for row in 0..3 {
            for col in 0..3 {
                rows[row][col] = self.mdc_raw[col * 3 + row] as f64 * self.delta[col] as f64;
            }
        }
        let crs_c = [
            self.dim1len as f64 / 2.0,
            self.dim2len as f64 / 2.0,
            self.dim3len as f64 / 2.0,
        ];
        for row in 0..3 {
            rows[row][3] = self.p_xyz_c[row] as f64
                - (rows[row][0] * crs_c[0] + rows[row][1] * crs_c[1] + rows[row][2] * crs_c[2]);
        }
        rows[3] = [0.0, 0.0, 0.0, 1.0];
        Affine4::from_rows(rows)
    }
}

/// Read an MGH or MGZ volume file.
pub fn read_mgh<P: AsRef<Path>>(path: P) -> Result<Volume> {
    let gz = is_gz_file(&path);
    let mut file = BufReader::new(File::open(path)?);
    if gz {
        let mut decoder = GzDecoder::new(file);
        read_mgh_from(&mut decoder)
    } else {
        read_mgh_from(&mut file)
    }
}

/// Read an MGH volume from the given byte stream.
pub fn read_mgh_from<S>(input: &mut S) -> Result<Volume>
where
    S: Read,
{
    let hdr = MghHeader::from_reader(input)?;

    if hdr.dim1len <= 0 || hdr.dim2len <= 0 || hdr.dim3len <= 0 {
        return Err(RibbonQcError::InvalidMghFormat);
    }

    let dim = (
        hdr.dim1len as usize,
        hdr.dim2len as usize,
        hdr.dim3len as usize,
    );
    let num_voxels = dim.0 * dim.1 * dim.2;

    if hdr.num_frames > 1 {
        log::warn!(
            "MGH file has {} frames, reading the first frame only",
            hdr.num_frames
        );
    }

    let mut input = ByteOrdered::be(input);
    let mut samples: Vec<f32> = Vec::with_capacity(num_voxels);
    match hdr.dtype {
        MGH_DTYPE_UCHAR => {
            for _ in 0..num_voxels {
                samples.push(input.read_u8()? as f32);
            }
        }
        MGH_DTYPE_INT => {
            for _ in 0..num_voxels {
                samples.push(input.read_i32()? as f32);
            }
        }
        MGH_DTYPE_FLOAT => {
            for _ in 0..num_voxels {
                samples.push(input.read_f32()?);
            }
        }
        MGH_DTYPE_SHORT => {
            for _ in 0..num_voxels {
                samples.push(input.read_i16()? as f32);
            }
        }
        other => return Err(RibbonQcError::UnsupportedMghDataType(other)),
    }

    // MGH stores the first grid axis fastest.
    let data = Array3::from_shape_vec(dim.f(), samples)
        .map_err(|_| RibbonQcError::InvalidMghFormat)?;

    let (affine, spacing) = if hdr.is_ras_good == 1 {
        (hdr.vox2ras(), hdr.delta)
    } else {
        log::warn!("MGH file carries no valid RAS block, assuming identity affine");
        (Affine4::identity(), [1.0, 1.0, 1.0])
    };

    Ok(Volume::new(data, affine, spacing))
}

/// Write a volume as an MGH or MGZ file, based on the file name.
///
/// Data is stored as MRI_FLOAT; the RAS block is recovered from the volume's
/// affine and grid shape.
pub fn write_mgh<P: AsRef<Path>>(volume: &Volume, path: P) -> Result<()> {
    let gz = is_gz_file(&path);
    let mut file = BufWriter::new(File::create(path)?);
    if gz {
        let mut enc = GzEncoder::new(file, Compression::default());
        write_mgh_to(volume, &mut enc)?;
        enc.finish()?;
        Ok(())
    } else {
        write_mgh_to(volume, &mut file)
    }
}

/// Write a volume as MGH to the given byte stream.
pub fn write_mgh_to<W>(volume: &Volume, out: &mut W) -> Result<()>
where
    W: Write,
{
    let (d1, d2, d3) = volume.shape();
    let mut out = ByteOrdered::be(out);

    out.write_i32(MGH_VERSION)?;
    out.write_i32(d1 as i32)?;
    out.write_i32(d2 as i32)?;
    out.write_i32(d3 as i32)?;
    out.write_i32(1)?; // num_frames
    out.write_i32(MGH_DTYPE_FLOAT)?;
    out.write_i32(0)?; // dof
    out.write_i16(1)?; // is_ras_good

    // Decompose the affine back into the RAS block: per-column norms give the
    // spacing, the normalized columns the direction cosines.
    let mut delta = [0.0f64; 3];
    let mut mdc = [0.0f64; 9];
    for col in 0..3 {
        let c = [
            volume.affine.at(0, col),
            volume.affine.at(1, col),
            volume.affine.at(2, col),
        ];
        let norm = (c[0] * c[0] + c[1] * c[1] + c[2] * c[2]).sqrt();
        delta[col] = norm;
        for row in 0..3 {
            mdc[col * 3 + row] = if norm > 0.0 { c[row] / norm } else { 0.0 };
        }
    }
    let p_xyz_c = volume
        .affine
        .apply([d1 as f64 / 2.0, d2 as f64 / 2.0, d3 as f64 / 2.0]);

    for col in 0..3 {
        out.write_f32(delta[col] as f32)?;
    }
    for idx in 0..9 {
        out.write_f32(mdc[idx] as f32)?;
    }
    for row in 0..3 {
        out.write_f32(p_xyz_c[row] as f32)?;
    }

    // Pad the header up to the data start.
    for _ in (30 + 60)..MGH_DATA_START {
        out.write_u8(0)?;
    }

    // First grid axis fastest, matching the read side.
    for k in 0..d3 {
        for j in 0..d2 {
            for i in 0..d1 {
                out.write_f32(volume.data[[i, j, k]])?;
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod test {
    use super::*;
    use approx::assert_abs_diff_eq;
    use std::io::Cursor;

    fn demo_volume() -> Volume {
        let mut data = Array3::zeros((4, 3, 2));
        for ((i, j, k), v) in data.indexed_iter_mut() {
            *v = (i + 10 * j + 100 * k) as f32;
        }
        let affine = Affine4::from_rows([
            [0.0, 0.0, 1.5, -3.0],
            [-1.0, 0.0, 0.0, 2.0],
            [0.0, 2.0, 0.0, 1.0],
            [0.0, 0.0, 0.0, 1.0],
        ]);
        Volume::new(data, affine, [1.0, 2.0, 1.5])
    }

    #[test]
    fn mgh_round_trip_preserves_grid_and_space() {
        let vol = demo_volume();

        let mut bytes: Vec<u8> = Vec::new();
        write_mgh_to(&vol, &mut bytes).unwrap();
        let read = read_mgh_from(&mut Cursor::new(bytes)).unwrap();

        assert_eq!(read.shape(), vol.shape());
        assert_eq!(read.data, vol.data);
        for row in 0..4 {
            for col in 0..4 {
                assert_abs_diff_eq!(
                    read.affine.at(row, col),
                    vol.affine.at(row, col),
                    epsilon = 1e-5
                );
            }
        }
        assert_abs_diff_eq!(read.spacing[0], 1.0, epsilon = 1e-6);
        assert_abs_diff_eq!(read.spacing[1], 2.0, epsilon = 1e-6);
        assert_abs_diff_eq!(read.spacing[2], 1.5, epsilon = 1e-6);
    }

    #[test]
    fn mgz_round_trip_through_file() {
        let vol = demo_volume();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ribbon.mgz");

        write_mgh(&vol, &path).unwrap();
        let read = read_mgh(&path).unwrap();

        assert_eq!(read.shape(), vol.shape());
        assert_eq!(read.data, vol.data);
    }

    #[test]
    fn wrong_version_is_rejected() {
        let mut bytes: Vec<u8> = Vec::new();
        bytes.extend_from_slice(&2i32.to_be_bytes());
        bytes.resize(MGH_DATA_START, 0);

        let res = read_mgh_from(&mut Cursor::new(bytes));
        assert!(matches!(res, Err(RibbonQcError::InvalidMghFormat)));
    }

    #[test]
    fn unknown_sample_type_is_rejected() {
        let mut bytes: Vec<u8> = Vec::new();
        bytes.extend_from_slice(&MGH_VERSION.to_be_bytes());
        for d in &[2i32, 2, 2, 1] {
            bytes.extend_from_slice(&d.to_be_bytes());
        }
        bytes.extend_from_slice(&10i32.to_be_bytes()); // bogus dtype
        bytes.extend_from_slice(&0i32.to_be_bytes()); // dof
        bytes.extend_from_slice(&0i16.to_be_bytes()); // is_ras_good
        bytes.resize(MGH_DATA_START, 0);

        let res = read_mgh_from(&mut Cursor::new(bytes));
        assert!(matches!(res, Err(RibbonQcError::UnsupportedMghDataType(10))));
    }

    #[test]
    fn uchar_samples_widen_to_f32() {
        let mut bytes: Vec<u8> = Vec::new();
        bytes.extend_from_slice(&MGH_VERSION.to_be_bytes());
        for d in &[2i32, 1, 1, 1] {
            bytes.extend_from_slice(&d.to_be_bytes());
        }
        bytes.extend_from_slice(&MGH_DTYPE_UCHAR.to_be_bytes());
        bytes.extend_from_slice(&0i32.to_be_bytes());
        bytes.extend_from_slice(&0i16.to_be_bytes());
        bytes.resize(MGH_DATA_START, 0);
        bytes.push(7);
        bytes.push(255);

        let vol = read_mgh_from(&mut Cursor::new(bytes)).unwrap();
        assert_eq!(vol.shape(), (2, 1, 1));
        assert_eq!(vol.data[[0, 0, 0]], 7.0);
        assert_eq!(vol.data[[1, 0, 0]], 255.0);
        assert_eq!(vol.affine, Affine4::identity());
    }
}
