use std::{
    fs::{create_dir_all, File},
    io::Write,
    path::PathBuf,
};

use tracing::warn;
use vtkio::model::*;

use crate::{error::Result, floating_type_mod::FT, lattice_state::LatticeState};

/// Writes one legacy VTK image per snapshot plus a `.vtk.series` index that ParaView reads
/// as a time series.
pub struct VtkExporter {
    /// `./out` with basename `lattice` expands to `./out/lattice-00001.vtk` and `./out/lattice.vtk.series`
    folder: PathBuf,
    basename: String,
    snapshot_number: usize,
    series_file: File,
}

impl VtkExporter {
    pub fn new(folder: impl Into<PathBuf>, basename: impl Into<String>) -> Result<VtkExporter> {
        let folder: PathBuf = folder.into();
        let basename: String = basename.into();

        create_dir_all(&folder)?;

        let mut series_file = File::create(folder.join(format!("{}.vtk.series", basename)))?;
        let series_prelude_str = "{\n\"file-series-version\": \"1.0\",\n\"files\": [";
        series_file.write_all(series_prelude_str.as_bytes())?;

        Ok(VtkExporter {
            series_file,
            folder,
            basename,
            snapshot_number: 1,
        })
    }

    /// Export the published fields; `time` is the step number of the snapshot.
    pub fn add_snapshot(&mut self, time: usize, state: &LatticeState) -> Result<PathBuf> {
        if self.snapshot_number > 1 {
            self.series_file.write_all(",".as_bytes())?;
        }

        let vtk_filename = format!("{}-{:05}.vtk", self.basename, self.snapshot_number);
        let path = self.folder.join(&vtk_filename);
        lattice_to_vtk(state, Some(path.clone())).export(&path)?;

        write!(
            self.series_file,
            "\n{{ \"name\": \"{}\", \"time\": {} }}",
            vtk_filename, time
        )?;

        self.snapshot_number += 1;
        Ok(path)
    }
}

impl Drop for VtkExporter {
    fn drop(&mut self) {
        let series_end_str = "\n]\n}";
        if let Err(e) = self.series_file.write_all(series_end_str.as_bytes()) {
            warn!("failed to close vtk series file: {}", e);
        }
    }
}

/// The lattice as structured points with unit spacing. Point data: `density`, `velocity`
/// (z = 0) and `obstacle` (0/1).
pub fn lattice_to_vtk(state: &LatticeState, file_path: Option<PathBuf>) -> Vtk {
    let dims = [state.width() as u32, state.height() as u32, 1];

    let mut vtk_density = DataArray::scalars("density", 1);
    vtk_density.data = state.density.clone().into();

    let mut vtk_velocity = DataArray::scalars("velocity", 3);
    vtk_velocity.data = state
        .velocity_x
        .iter()
        .zip(state.velocity_y.iter())
        .flat_map(|(&ux, &uy)| [ux, uy, 0. as FT])
        .collect::<Vec<FT>>()
        .into();

    let mut vtk_obstacle = DataArray::scalars("obstacle", 1);
    vtk_obstacle.data = state.obstacle.iter().map(|&o| o as u8).collect::<Vec<u8>>().into();

    Vtk {
        version: Version::new((4, 2)),
        byte_order: ByteOrder::BigEndian,
        title: String::from("D2Q9 lattice"),
        file_path,
        data: DataSet::ImageData {
            extent: Extent::Dims(dims),
            origin: [0.; 3],
            spacing: [1.; 3],
            meta: None,
            pieces: vec![Piece::Inline(Box::new(ImageDataPiece {
                extent: Extent::Dims(dims),
                data: Attributes {
                    cell: Vec::new(),
                    point: vec![
                        Attribute::DataArray(vtk_density),
                        Attribute::DataArray(vtk_velocity),
                        Attribute::DataArray(vtk_obstacle),
                    ],
                },
            }))],
        },
    }
}
