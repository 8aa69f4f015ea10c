//! Command line arguments for the viewer binary.

use std::path::PathBuf;

use clap::Parser;
use glam::Vec2;
use terrain_viewer::{
    GridSize, HeightMapping, IndexTopology, NoiseField, NormalMode, TerrainConfig,
    VertexPlacement, ViewerConfig,
};

/// Index buffer layout selection for CLI.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum CliTopology {
    /// Three indices per triangle.
    #[default]
    List,
    /// One triangle strip per grid row.
    Strip,
}

impl From<CliTopology> for IndexTopology {
    fn from(cli: CliTopology) -> Self {
        match cli {
            CliTopology::List => IndexTopology::TriangleList,
            CliTopology::Strip => IndexTopology::TriangleStrip,
        }
    }
}

/// Normal generation selection for CLI.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum CliNormals {
    /// Flat shading, one normal per triangle.
    Face,
    /// Per-vertex normals averaged from adjacent faces.
    #[default]
    Smooth,
}

impl From<CliNormals> for NormalMode {
    fn from(cli: CliNormals) -> Self {
        match cli {
            CliNormals::Face => NormalMode::Face,
            CliNormals::Smooth => NormalMode::Smooth,
        }
    }
}

/// Terrain viewer arguments.
#[derive(Parser, Debug)]
#[command(
    name = "terrain-viewer",
    about = "Render a heightmap image or fractal noise as 3D terrain",
    long_about = "Render a heightmap image or fractal noise as 3D terrain.\n\n\
        Without --heightmap (or when the image cannot be decoded) the terrain\n\
        is generated from fractal gradient noise.\n\
        \n\
        EXAMPLES:\n\
          # Procedural terrain on a 256x256 grid\n\
          ./terrain-viewer --grid-size 256\n\
        \n\
          # Heightmap image drawn as triangle strips\n\
          ./terrain-viewer --heightmap iceland.png --topology strip",
    version
)]
pub struct ClapArgs {
    /// Heightmap image; its first channel becomes the height.
    #[arg(long)]
    pub heightmap: Option<PathBuf>,

    /// Procedural grid size (also the noise coordinate divisor).
    #[arg(long, default_value_t = terrain_viewer::DEFAULT_GRID_SIZE)]
    pub grid_size: u32,

    /// Resample the source to WIDTHxHEIGHT instead of its native size.
    #[arg(long, value_parser = parse_resolution)]
    pub resolution: Option<(u32, u32)>,

    /// Noise octaves.
    #[arg(long, default_value_t = terrain_viewer::terrain::DEFAULT_OCTAVES)]
    pub octaves: u32,

    /// Gain applied to the octave sum before clamping.
    #[arg(long, default_value_t = terrain_viewer::terrain::DEFAULT_GAIN)]
    pub gain: f32,

    /// Noise sampling offset along x, in grid cells.
    #[arg(long, default_value_t = 0.0, allow_negative_numbers = true)]
    pub offset_x: f32,

    /// Noise sampling offset along y, in grid cells.
    #[arg(long, default_value_t = 0.0, allow_negative_numbers = true)]
    pub offset_y: f32,

    /// World units per heightmap intensity step.
    #[arg(long, default_value_t = 64.0 / 256.0)]
    pub height_scale: f32,

    /// Offset added to scaled heightmap intensities.
    #[arg(long, default_value_t = -16.0, allow_negative_numbers = true)]
    pub height_shift: f32,

    /// Multiplier applied to every height sample.
    #[arg(long, default_value_t = 1.0, allow_negative_numbers = true)]
    pub vertical_scale: f32,

    /// Index buffer layout.
    #[arg(long, default_value = "list", value_enum)]
    pub topology: CliTopology,

    /// Normal generation mode.
    #[arg(long, default_value = "smooth", value_enum)]
    pub normals: CliNormals,

    /// Initial window width in pixels.
    #[arg(long, default_value = "1280")]
    pub width: u32,

    /// Initial window height in pixels.
    #[arg(long, default_value = "720")]
    pub height: u32,

    /// Disable vertical sync (may cause tearing).
    #[arg(long)]
    pub no_vsync: bool,

    /// Start in wireframe mode.
    #[arg(long)]
    pub wireframe: bool,

    /// Exit after rendering N frames (useful for testing).
    #[arg(long)]
    pub max_frames: Option<u64>,
}

fn parse_resolution(s: &str) -> Result<(u32, u32), String> {
    let (w, h) = s
        .split_once(['x', 'X'])
        .ok_or_else(|| format!("expected WIDTHxHEIGHT, got '{}'", s))?;
    let w = w.trim().parse::<u32>().map_err(|e| e.to_string())?;
    let h = h.trim().parse::<u32>().map_err(|e| e.to_string())?;
    Ok((w, h))
}

impl From<&ClapArgs> for ViewerConfig {
    fn from(args: &ClapArgs) -> Self {
        // Image terrain uses the centered one-unit-per-pixel layout
        let placement = if args.heightmap.is_some() {
            VertexPlacement::Centered
        } else {
            VertexPlacement::Normalized
        };

        let size = match args.resolution {
            Some((width, height)) => GridSize::Fixed { width, height },
            None => GridSize::Native,
        };

        Self {
            width: args.width,
            height: args.height,
            vsync: !args.no_vsync,
            wireframe: args.wireframe,
            terrain: TerrainConfig {
                heightmap: args.heightmap.clone(),
                mapping: HeightMapping::new(args.height_scale, args.height_shift),
                noise: NoiseField::new(args.octaves, args.gain),
                grid_size: args.grid_size,
                noise_offset: Vec2::new(args.offset_x, args.offset_y),
                size,
                placement,
                topology: args.topology.into(),
                normals: args.normals.into(),
                vertical_scale: args.vertical_scale,
            },
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> ClapArgs {
        ClapArgs::try_parse_from(std::iter::once("terrain-viewer").chain(args.iter().copied()))
            .unwrap()
    }

    #[test]
    fn test_defaults_match_config() {
        let config = ViewerConfig::from(&parse(&[]));
        assert_eq!(config, ViewerConfig::default());
    }

    #[test]
    fn test_heightmap_switches_to_centered() {
        let config = ViewerConfig::from(&parse(&["--heightmap", "map.png", "--topology", "strip"]));
        assert_eq!(config.terrain.placement, VertexPlacement::Centered);
        assert_eq!(config.terrain.topology, IndexTopology::TriangleStrip);
        assert_eq!(config.terrain.heightmap, Some(PathBuf::from("map.png")));
    }

    #[test]
    fn test_negative_offsets_and_resolution() {
        let config = ViewerConfig::from(&parse(&[
            "--offset-x",
            "-12.5",
            "--offset-y",
            "3",
            "--resolution",
            "64x32",
            "--no-vsync",
        ]));
        assert_eq!(config.terrain.noise_offset, Vec2::new(-12.5, 3.0));
        assert_eq!(
            config.terrain.size,
            GridSize::Fixed {
                width: 64,
                height: 32
            }
        );
        assert!(!config.vsync);
    }

    #[test]
    fn test_bad_resolution() {
        assert!(parse_resolution("64").is_err());
        assert!(parse_resolution("ax2").is_err());
        assert_eq!(parse_resolution("8X4"), Ok((8, 4)));
    }
}
