use std::{
    fs::{create_dir_all, File},
    io::BufWriter,
    path::{Path, PathBuf},
};

use tracing::{debug, info};

use crate::{
    analysis::{snapshot_file_name, write_snapshot, MetricsLog, MetricsSampler, PerformanceLog},
    colors::VisualizationParams,
    error::Result,
    LbmSimulation,
};

use super::{image_exporter::ImageExporter, vtk_exporter::VtkExporter};

pub const METRICS_FILE_NAME: &str = "simulation_log.csv";
pub const PERFORMANCE_FILE_NAME: &str = "performance_log.csv";

/// How often (in frames) each output is produced. Zero disables an output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OutputSchedule {
    pub metrics_every: usize,
    pub snapshot_every: usize,
    pub image_every: usize,
    pub vtk_every: usize,
}

impl Default for OutputSchedule {
    fn default() -> Self {
        OutputSchedule {
            metrics_every: 1,
            snapshot_every: 0,
            image_every: 10,
            vtk_every: 0,
        }
    }
}

fn due(every: usize, frame: usize) -> bool {
    every > 0 && frame % every == 0
}

/// Everything a run writes into its output directory.
pub struct Recorder {
    output_dir: PathBuf,
    schedule: OutputSchedule,
    sampler: MetricsSampler,
    metrics_log: MetricsLog<BufWriter<File>>,
    performance_log: PerformanceLog<BufWriter<File>>,
    image_exporter: Option<ImageExporter>,
    vtk_exporter: Option<VtkExporter>,
}

impl Recorder {
    pub fn new(
        output_dir: &Path,
        schedule: OutputSchedule,
        visualization_params: VisualizationParams,
        upscale: usize,
    ) -> Result<Recorder> {
        create_dir_all(output_dir)?;

        let metrics_log = MetricsLog::new(BufWriter::new(File::create(output_dir.join(METRICS_FILE_NAME))?))?;
        let performance_log =
            PerformanceLog::new(BufWriter::new(File::create(output_dir.join(PERFORMANCE_FILE_NAME))?))?;

        let image_exporter = if schedule.image_every > 0 {
            Some(ImageExporter::new(output_dir.join("frames"), visualization_params, upscale)?)
        } else {
            None
        };
        let vtk_exporter = if schedule.vtk_every > 0 {
            Some(VtkExporter::new(output_dir.join("vtk"), "lattice")?)
        } else {
            None
        };

        Ok(Recorder {
            output_dir: output_dir.to_path_buf(),
            schedule,
            sampler: MetricsSampler::new(),
            metrics_log,
            performance_log,
            image_exporter,
            vtk_exporter,
        })
    }

    /// Write all outputs due after `frame` (counted from 1). `frame_seconds` is the wall
    /// time the frame's steps took.
    pub fn record_frame(&mut self, sim: &mut LbmSimulation, frame: usize, frame_seconds: f64) -> Result<()> {
        let step = sim.step_number();
        self.performance_log.append(step, frame_seconds)?;

        if due(self.schedule.metrics_every, frame) {
            let metrics = self.sampler.sample(&sim.state, step);
            self.metrics_log.append(&metrics)?;
            sim.record_metrics(&metrics);
            debug!(
                step,
                kinetic_energy = metrics.kinetic_energy,
                total_mass = metrics.total_mass,
                residual = metrics.residual,
                "metrics"
            );
        }

        if due(self.schedule.snapshot_every, frame) {
            let path = self.output_dir.join(snapshot_file_name(step));
            write_snapshot(BufWriter::new(File::create(&path)?), &sim.state)?;
            info!("snapshot written: {}", path.display());
        }

        if due(self.schedule.image_every, frame) {
            if let Some(image_exporter) = &self.image_exporter {
                let path = image_exporter.export_frame(&sim.state, frame)?;
                debug!("frame written: {}", path.display());
            }
        }

        if due(self.schedule.vtk_every, frame) {
            if let Some(vtk_exporter) = &mut self.vtk_exporter {
                let path = vtk_exporter.add_snapshot(step, &sim.state)?;
                debug!("vtk written: {}", path.display());
            }
        }

        Ok(())
    }

    pub fn finish(mut self) -> Result<()> {
        self.metrics_log.flush()?;
        self.performance_log.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{init_lbm_sim, simulation_parameters::SimulationParams, SceneConfig};

    #[test]
    fn schedule_zero_disables() {
        assert!(!due(0, 5));
        assert!(due(5, 10));
        assert!(!due(5, 11));
    }

    #[test]
    fn recorder_writes_due_outputs() {
        let dir = std::env::temp_dir().join(format!("lattice-flow-recorder-{}", std::process::id()));
        let params = SimulationParams {
            width: 10,
            height: 6,
            steps_per_frame: 2,
            ..Default::default()
        };
        let mut sim = init_lbm_sim(params, &SceneConfig::default(), false).unwrap();
        let schedule = OutputSchedule {
            metrics_every: 1,
            snapshot_every: 2,
            image_every: 3,
            vtk_every: 0,
        };

        let mut recorder = Recorder::new(&dir, schedule, VisualizationParams::default(), 2).unwrap();
        for frame in 1..=3 {
            sim.run_frame();
            recorder.record_frame(&mut sim, frame, 0.001).unwrap();
        }
        recorder.finish().unwrap();

        let metrics = std::fs::read_to_string(dir.join(METRICS_FILE_NAME)).unwrap();
        assert_eq!(metrics.lines().count(), 1 + 3);
        assert!(metrics.lines().nth(3).unwrap().starts_with("6,"));

        let performance = std::fs::read_to_string(dir.join(PERFORMANCE_FILE_NAME)).unwrap();
        assert_eq!(performance.lines().nth(1).unwrap(), "2,0.001000");

        assert!(dir.join("snapshot_00004.csv").exists());
        assert!(!dir.join("snapshot_00002.csv").exists());
        assert!(dir.join("frames").join("frame_00003.png").exists());
        assert!(!dir.join("vtk").exists());

        std::fs::remove_dir_all(&dir).unwrap();
    }
}
