mod image_exporter;
mod main_loop;
mod recorder;
mod vtk_exporter;

pub use main_loop::start;
