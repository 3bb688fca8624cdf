use quick_error::quick_error;
use std::io::Error as IOError;

quick_error! {
    /// Error type for all error variants originated by this crate.
    #[derive(Debug)]
    pub enum RibbonQcError {
        /// The affine of a reference volume cannot be inverted, so no
        /// world-to-grid mapping exists.
        SingularAffine {
            display("Volume affine is singular and cannot be inverted")
        }

        /// A surface vertex coordinate is NaN or infinite.
        NonFiniteVertex {
            display("Surface mesh contains a non-finite vertex coordinate")
        }

        /// Invalid MGH volume file: wrong version number.
        InvalidMghFormat {
            display("Invalid MGH volume file")
        }

        /// The MGH file declares a sample type this crate does not read.
        UnsupportedMghDataType(dtype: i32) {
            display("Unsupported MGH data type code {}", dtype)
        }

        /// Invalid surface file: wrong magic number.
        InvalidSurfaceFormat {
            display("Invalid FreeSurfer surf file")
        }

        /// Two volumes expected to live on the same grid have different shapes.
        VolumeShapeMismatch {
            display("Volumes do not share a common grid shape")
        }

        /// A rendering backend reported a failure.
        Rendering(msg: String) {
            display("Rendering backend failed: {}", msg)
        }

        /// I/O Error
        Io(err: IOError) {
            from()
            source(err)
        }
    }
}

/// Alias type for results originated from this crate.
pub type Result<T> = ::std::result::Result<T, RibbonQcError>;
