//! Legacy-ASCII VTK snapshot writers.
//!
//! Each rank writes its own `.vtk` file. With more than one rank, rank 0
//! also writes a `.visit` index listing every rank's file so the blocks
//! open as one dataset.

use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use mpm_comm::Communicator;
use mpm_core::Particle;
use mpm_mesh::Mesh;
use mpm_particles::ProblemManager;

use super::{DomainWriter, OutputError, ParticleWriter};

fn io_err(path: &Path) -> impl FnOnce(io::Error) -> OutputError + '_ {
    move |source| OutputError::Io {
        path: path.to_path_buf(),
        source,
    }
}

fn write_file<F>(path: &Path, body: F) -> Result<(), OutputError>
where
    F: FnOnce(&mut BufWriter<File>) -> io::Result<()>,
{
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(io_err(path))?;
    }
    let file = File::create(path).map_err(io_err(path))?;
    let mut out = BufWriter::new(file);
    body(&mut out).map_err(io_err(path))?;
    out.flush().map_err(io_err(path))
}

fn write_visit_index<W: Write>(out: &mut W, blocks: &[String]) -> io::Result<()> {
    writeln!(out, "!NBLOCKS {}", blocks.len())?;
    for name in blocks {
        writeln!(out, "{name}")?;
    }
    Ok(())
}

// ── Particles ───────────────────────────────────────────────────

/// Writes `particles_{step}_rank_{rank}.vtk` per rank as VTK polydata.
#[derive(Clone, Debug)]
pub struct VtkParticleWriter {
    dir: PathBuf,
}

impl VtkParticleWriter {
    /// Writer placing files in `dir` (created on first write).
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// File name of `rank`'s particles at `step`.
    pub fn file_name(step: u64, rank: usize) -> String {
        format!("particles_{step}_rank_{rank}.vtk")
    }

    /// Format one rank's particles.
    pub fn write_particles<W: Write>(
        out: &mut W,
        step: u64,
        time: f64,
        particles: &[Particle],
    ) -> io::Result<()> {
        let n = particles.len();
        writeln!(out, "# vtk DataFile Version 3.0")?;
        writeln!(out, "particles step {step}")?;
        writeln!(out, "ASCII")?;
        writeln!(out, "DATASET POLYDATA")?;
        writeln!(out, "FIELD FieldData 2")?;
        writeln!(out, "TIME 1 1 double")?;
        writeln!(out, "{time:e}")?;
        writeln!(out, "CYCLE 1 1 int")?;
        writeln!(out, "{step}")?;
        writeln!(out, "POINTS {n} double")?;
        for p in particles {
            let [x, y, z] = p.position;
            writeln!(out, "{x:e} {y:e} {z:e}")?;
        }
        writeln!(out, "VERTICES {n} {}", 2 * n)?;
        for i in 0..n {
            writeln!(out, "1 {i}")?;
        }
        if n == 0 {
            return Ok(());
        }
        writeln!(out, "POINT_DATA {n}")?;
        writeln!(out, "VECTORS velocity double")?;
        for p in particles {
            let [u, v, w] = p.velocity;
            writeln!(out, "{u:e} {v:e} {w:e}")?;
        }
        let scalars: [(&str, fn(&Particle) -> f64); 2] = [("j", |p| p.j), ("mass", |p| p.mass)];
        for (name, value) in scalars {
            writeln!(out, "SCALARS {name} double 1")?;
            writeln!(out, "LOOKUP_TABLE default")?;
            for p in particles {
                writeln!(out, "{:e}", value(p))?;
            }
        }
        Ok(())
    }
}

impl ParticleWriter for VtkParticleWriter {
    fn write_time_step(
        &mut self,
        comm: &dyn Communicator,
        _mesh: &Mesh,
        step: u64,
        time: f64,
        pm: &ProblemManager,
    ) -> Result<(), OutputError> {
        let path = self.dir.join(Self::file_name(step, comm.rank()));
        write_file(&path, |out| {
            Self::write_particles(out, step, time, pm.particles())
        })?;
        if comm.rank() == 0 && comm.size() > 1 {
            let blocks: Vec<String> = (0..comm.size())
                .map(|r| Self::file_name(step, r))
                .collect();
            let index = self.dir.join(format!("particles_{step}.visit"));
            write_file(&index, |out| write_visit_index(out, &blocks))?;
        }
        tracing::trace!(step, path = %path.display(), "wrote particle snapshot");
        Ok(())
    }
}

// ── Domain ──────────────────────────────────────────────────────

/// Writes `{basename}_{step}_{rank}.vtk` per rank as one hexahedron.
#[derive(Clone, Debug)]
pub struct VtkDomainWriter {
    dir: PathBuf,
}

impl VtkDomainWriter {
    /// Writer placing files in `dir` (created on first write).
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// File name of `rank`'s block under `basename` at `step`.
    pub fn file_name(basename: &str, step: u64, rank: usize) -> String {
        format!("{basename}_{step}_{rank}.vtk")
    }

    /// Format one block as an unstructured grid of a single hexahedron.
    pub fn write_block<W: Write>(out: &mut W, rank: usize, vertices: &[f64; 6]) -> io::Result<()> {
        let [x0, y0, z0, x1, y1, z1] = *vertices;
        writeln!(out, "# vtk DataFile Version 3.0")?;
        writeln!(out, "domain of rank {rank}")?;
        writeln!(out, "ASCII")?;
        writeln!(out, "DATASET UNSTRUCTURED_GRID")?;
        writeln!(out, "POINTS 8 double")?;
        // VTK_HEXAHEDRON node order: bottom face counter-clockwise, then top.
        for [x, y, z] in [
            [x0, y0, z0],
            [x1, y0, z0],
            [x1, y1, z0],
            [x0, y1, z0],
            [x0, y0, z1],
            [x1, y0, z1],
            [x1, y1, z1],
            [x0, y1, z1],
        ] {
            writeln!(out, "{x:e} {y:e} {z:e}")?;
        }
        writeln!(out, "CELLS 1 9")?;
        writeln!(out, "8 0 1 2 3 4 5 6 7")?;
        writeln!(out, "CELL_TYPES 1")?;
        writeln!(out, "12")?;
        writeln!(out, "CELL_DATA 1")?;
        writeln!(out, "SCALARS rank int 1")?;
        writeln!(out, "LOOKUP_TABLE default")?;
        writeln!(out, "{rank}")
    }
}

impl DomainWriter for VtkDomainWriter {
    fn write_domain(
        &mut self,
        comm: &dyn Communicator,
        step: u64,
        vertices: &[f64; 6],
        basename: &str,
    ) -> Result<(), OutputError> {
        let rank = comm.rank();
        let path = self.dir.join(Self::file_name(basename, step, rank));
        write_file(&path, |out| Self::write_block(out, rank, vertices))?;
        if rank == 0 && comm.size() > 1 {
            let blocks: Vec<String> = (0..comm.size())
                .map(|r| Self::file_name(basename, step, r))
                .collect();
            let index = self.dir.join(format!("{basename}_{step}.visit"));
            write_file(&index, |out| write_visit_index(out, &blocks))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mpm_comm::run_spmd;

    fn scratch_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("mpm-vtk-{name}-{}", std::process::id()));
        let _ = fs::remove_dir_all(&dir);
        dir
    }

    #[test]
    fn particle_file_layout() {
        let particles = vec![
            Particle {
                position: [0.5, 0.25, 1.0],
                velocity: [1.0, 0.0, -2.0],
                mass: 3.0,
                ..Particle::default()
            },
            Particle::default(),
        ];
        let mut buf = Vec::new();
        VtkParticleWriter::write_particles(&mut buf, 6, 0.5, &particles).unwrap();
        let text = String::from_utf8(buf).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "# vtk DataFile Version 3.0");
        assert_eq!(lines[6], "5e-1");
        assert_eq!(lines[8], "6");
        assert_eq!(lines[9], "POINTS 2 double");
        assert_eq!(lines[10], "5e-1 2.5e-1 1e0");
        assert!(text.contains("VERTICES 2 4\n1 0\n1 1\n"));
        assert!(text.contains("VECTORS velocity double\n1e0 0e0 -2e0\n"));
        assert!(text.contains("SCALARS j double 1\nLOOKUP_TABLE default\n1e0\n1e0\n"));
        assert!(text.contains("SCALARS mass double 1\nLOOKUP_TABLE default\n3e0\n0e0\n"));
    }

    #[test]
    fn empty_rank_writes_no_point_data() {
        let mut buf = Vec::new();
        VtkParticleWriter::write_particles(&mut buf, 0, 0.0, &[]).unwrap();
        let text = String::from_utf8(buf).unwrap();
        assert!(text.contains("POINTS 0 double"));
        assert!(!text.contains("POINT_DATA"));
    }

    #[test]
    fn block_is_one_hexahedron() {
        let mut buf = Vec::new();
        VtkDomainWriter::write_block(&mut buf, 3, &[0.0, 0.0, 0.0, 1.0, 2.0, 3.0]).unwrap();
        let text = String::from_utf8(buf).unwrap();
        assert!(text.contains("POINTS 8 double\n0e0 0e0 0e0\n1e0 0e0 0e0\n"));
        assert!(text.contains("1e0 2e0 3e0\n"));
        assert!(text.contains("CELL_TYPES 1\n12\n"));
        assert!(text.ends_with("LOOKUP_TABLE default\n3\n"));
    }

    #[test]
    fn rank_zero_writes_visit_index() {
        let dir = scratch_dir("domain");
        run_spmd(3, |comm| {
            let mut w = VtkDomainWriter::new(&dir);
            let v = [comm.rank() as f64, 0.0, 0.0, comm.rank() as f64 + 1.0, 1.0, 1.0];
            w.write_domain(&*comm, 0, &v, "domain_act").unwrap();
        });
        for rank in 0..3 {
            assert!(dir.join(format!("domain_act_0_{rank}.vtk")).is_file());
        }
        let index = fs::read_to_string(dir.join("domain_act_0.visit")).unwrap();
        assert_eq!(
            index,
            "!NBLOCKS 3\ndomain_act_0_0.vtk\ndomain_act_0_1.vtk\ndomain_act_0_2.vtk\n"
        );
        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn unwritable_directory_is_an_io_error() {
        let dir = scratch_dir("blocked");
        fs::create_dir_all(dir.parent().unwrap()).unwrap();
        // A regular file where the output directory should be.
        fs::write(&dir, b"not a directory").unwrap();
        let mut w = VtkDomainWriter::new(dir.join("sub"));
        match w.write_domain(&mpm_comm::SelfComm, 0, &[0.0; 6], "domain_lb") {
            Err(OutputError::Io { .. }) => {}
            other => panic!("expected Io error, got {other:?}"),
        }
        fs::remove_file(&dir).unwrap();
    }
}
