use crate::capacity::max_payload_bytes;
use crate::config::{EmbeddingParameters, Method, SubBand};
use crate::corruption::flip_random_lsbs;
use crate::filter::CoverFilter;
use crate::quality::psnr;
use crate::steganography::SteganographyEngine;
use anyhow::{bail, Context, Result};
use base64::{engine::general_purpose::STANDARD as BASE64_STANDARD, Engine as _};
use clap::{Args, Parser, Subcommand};
use image::{io::Reader as ImageReader, ImageBuffer, Rgb, RgbImage};
use jpeg_encoder::{ColorType, Encoder};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::fs;
use std::path::{Path, PathBuf};

/// Command-line interface for the steganography tool
#[derive(Parser)]
#[command(name = "multisteg")]
#[command(about = "Hide payloads in images using LSB, block-DCT or Haar-DWT embedding")]
#[command(version)]
pub struct CommandLineInterface {
    /// Log codec details (same as RUST_LOG=debug)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: SteganographyCommand,
}

/// Settings that encoder and decoder must agree on
#[derive(Args, Debug, Clone)]
pub struct EmbeddingOptions {
    /// Embedding domain
    #[arg(short, long, default_value = "lsb", help = "Embedding method: lsb, dct or dwt")]
    pub method: Method,

    /// Passphrase used to encrypt the payload
    #[arg(short, long)]
    pub passphrase: Option<String>,

    /// Protect the payload with Reed-Solomon shards
    #[arg(long)]
    pub ecc: bool,

    /// Low bits per channel used by the LSB method
    #[arg(long, default_value_t = 1)]
    pub lsb_bits: u8,

    /// Payload bytes per Reed-Solomon shard
    #[arg(long, default_value_t = 32)]
    pub shard_size: usize,

    /// Parity symbols per Reed-Solomon shard
    #[arg(long, default_value_t = 8)]
    pub redundancy: usize,

    /// Detail sub-band used by the DWT method
    #[arg(long, default_value = "diagonal", help = "DWT sub-band: horizontal, vertical or diagonal")]
    pub subband: SubBand,
}

impl EmbeddingOptions {
    fn embedding_parameters(&self) -> EmbeddingParameters {
        EmbeddingParameters {
            lsb_bits_per_channel: self.lsb_bits,
            ecc_shard_size: self.shard_size,
            ecc_redundancy_symbols: self.redundancy,
            dwt_subband: self.subband,
            ..EmbeddingParameters::default()
        }
    }
}

/// Available steganography commands
#[derive(Subcommand)]
pub enum SteganographyCommand {
    /// Hide a payload in an image
    Hide {
        /// Input image file path
        #[arg(short, long, help = "Path to the cover image")]
        input: PathBuf,

        /// Output image file path (PNG is used when no extension is given)
        #[arg(short, long, help = "Output path for the stego image")]
        output: PathBuf,

        /// Text payload to hide
        #[arg(short, long, conflicts_with = "data_file")]
        data: Option<String>,

        /// File whose raw bytes are the payload
        #[arg(long)]
        data_file: Option<PathBuf>,

        /// Filter applied to the cover before LSB embedding
        #[arg(long, default_value = "none", help = "Cover filter: none, blur, sharpen or grayscale")]
        filter: CoverFilter,

        #[command(flatten)]
        options: EmbeddingOptions,
    },

    /// Extract a payload from a stego image
    Extract {
        /// Stego image file path
        #[arg(short, long, help = "Path to the stego image")]
        input: PathBuf,

        /// Write the raw payload bytes to this file
        #[arg(short, long)]
        output: Option<PathBuf>,

        #[command(flatten)]
        options: EmbeddingOptions,
    },

    /// Report how much an image can carry
    Capacity {
        /// Image file path
        #[arg(short, long)]
        input: PathBuf,

        /// Only report this method
        #[arg(short, long)]
        method: Option<Method>,

        /// Low bits per channel used by the LSB method
        #[arg(long, default_value_t = 1)]
        lsb_bits: u8,

        /// Payload bytes per Reed-Solomon shard
        #[arg(long, default_value_t = 32)]
        shard_size: usize,

        /// Parity symbols per Reed-Solomon shard
        #[arg(long, default_value_t = 8)]
        redundancy: usize,
    },

    /// Embed the same text with every method and compare distortion
    Compare {
        /// Cover image file path
        #[arg(short, long)]
        input: PathBuf,

        /// Text payload to hide
        #[arg(short, long)]
        data: String,

        /// Passphrase used to encrypt the payload
        #[arg(short, long)]
        passphrase: Option<String>,

        /// Directory receiving one stego PNG per method
        #[arg(long)]
        out_dir: Option<PathBuf>,
    },

    /// Damage a stego image to test checksum and ECC behavior
    Attack {
        /// Image to damage
        #[arg(short, long)]
        input: PathBuf,

        /// Output image file path
        #[arg(short, long)]
        output: PathBuf,

        /// Recompress as JPEG with this quality (1-100)
        #[arg(long, conflicts_with = "flip_bits")]
        jpeg_quality: Option<u8>,

        /// Flip the least significant bit of this many channel values
        #[arg(long)]
        flip_bits: Option<usize>,

        /// Seed for choosing the flipped values
        #[arg(long, default_value_t = 0)]
        seed: u64,
    },

    /// Generate a demonstration with a test image
    Demo {
        /// Directory receiving the demo images
        #[arg(long, default_value = ".")]
        out_dir: PathBuf,
    },
}

/// Command-line interface handler
#[derive(Default)]
pub struct CommandLineHandler;

impl CommandLineHandler {
    pub fn new() -> Self {
        Self
    }

    /// Processes the command-line interface and executes the appropriate command
    pub fn process_command(&mut self, cli: CommandLineInterface) -> Result<()> {
        match cli.command {
            SteganographyCommand::Hide {
                input,
                output,
                data,
                data_file,
                filter,
                options,
            } => self.handle_hide_command(&input, &output, data, data_file, filter, &options),

            SteganographyCommand::Extract {
                input,
                output,
                options,
            } => self.handle_extract_command(&input, output.as_deref(), &options),

            SteganographyCommand::Capacity {
                input,
                method,
                lsb_bits,
                shard_size,
                redundancy,
            } => {
                let embedding_parameters = EmbeddingParameters {
                    lsb_bits_per_channel: lsb_bits,
                    ecc_shard_size: shard_size,
                    ecc_redundancy_symbols: redundancy,
                    ..EmbeddingParameters::default()
                };
                self.handle_capacity_command(&input, method, embedding_parameters)
            }

            SteganographyCommand::Compare {
                input,
                data,
                passphrase,
                out_dir,
            } => self.handle_compare_command(&input, &data, passphrase.as_deref(), out_dir.as_deref()),

            SteganographyCommand::Attack {
                input,
                output,
                jpeg_quality,
                flip_bits,
                seed,
            } => self.handle_attack_command(&input, &output, jpeg_quality, flip_bits, seed),

            SteganographyCommand::Demo { out_dir } => self.handle_demo_command(&out_dir),
        }
    }

    /// Handles the hide command to embed data in an image
    fn handle_hide_command(
        &mut self,
        input_path: &Path,
        output_path: &Path,
        text_data: Option<String>,
        data_file: Option<PathBuf>,
        cover_filter: CoverFilter,
        options: &EmbeddingOptions,
    ) -> Result<()> {
        let payload = match (text_data, data_file) {
            (Some(text), None) => text.into_bytes(),
            (None, Some(data_path)) => fs::read(&data_path)
                .with_context(|| format!("failed to read payload file {}", data_path.display()))?,
            _ => bail!("provide the payload with either --data or --data-file"),
        };

        let mut cover_image = load_rgb_image(input_path)?;
        println!(
            "Loaded cover image: {}x{} pixels",
            cover_image.width(),
            cover_image.height()
        );

        if cover_filter != CoverFilter::None {
            if options.method != Method::Lsb {
                bail!("--filter only applies to the lsb method");
            }
            cover_image = cover_filter.apply(&cover_image);
            println!("Applied {} filter to the cover", cover_filter);
        }

        let steganography_engine =
            SteganographyEngine::with_parameters(options.embedding_parameters());
        let steganographic_image = steganography_engine.encode(
            &cover_image,
            &payload,
            options.method,
            options.passphrase.as_deref(),
            options.ecc,
        )?;

        let output_file_path = output_file_path(output_path);
        save_rgb_image(&steganographic_image, &output_file_path)?;

        println!(
            "Hid {} bytes with {}{}{}",
            payload.len(),
            options.method,
            if options.passphrase.is_some() { ", encrypted" } else { "" },
            if options.ecc { ", ECC" } else { "" }
        );
        println!("Stego image saved to: {}", output_file_path.display());
        Ok(())
    }

    /// Handles the extract command to retrieve data from a stego image
    fn handle_extract_command(
        &mut self,
        input_path: &Path,
        output_path: Option<&Path>,
        options: &EmbeddingOptions,
    ) -> Result<()> {
        let steganographic_image = load_rgb_image(input_path)?;

        let steganography_engine =
            SteganographyEngine::with_parameters(options.embedding_parameters());
        let payload = steganography_engine.decode(
            &steganographic_image,
            options.method,
            options.passphrase.as_deref(),
            options.ecc,
        )?;

        if let Some(output_path) = output_path {
            fs::write(output_path, &payload)
                .with_context(|| format!("failed to write {}", output_path.display()))?;
            println!(
                "Extracted {} bytes to {}",
                payload.len(),
                output_path.display()
            );
            return Ok(());
        }

        match String::from_utf8(payload) {
            Ok(secret_message) => {
                println!("Successfully extracted secret message:");
                println!("{}", secret_message);
            }
            Err(binary_payload) => {
                println!("Extracted binary payload (base64):");
                println!("{}", BASE64_STANDARD.encode(binary_payload.as_bytes()));
            }
        }
        Ok(())
    }

    /// Handles the capacity command
    fn handle_capacity_command(
        &mut self,
        input_path: &Path,
        method: Option<Method>,
        embedding_parameters: EmbeddingParameters,
    ) -> Result<()> {
        let carrier_image = load_rgb_image(input_path)?;
        let steganography_engine = SteganographyEngine::with_parameters(embedding_parameters);
        let methods = match method {
            Some(method) => vec![method],
            None => Method::ALL.to_vec(),
        };

        println!(
            "Image: {}x{} pixels",
            carrier_image.width(),
            carrier_image.height()
        );
        for method in methods {
            let capacity = steganography_engine.capacity_bits(&carrier_image, method)?;
            let plain_bytes =
                max_payload_bytes(capacity, steganography_engine.parameters(), false)?;
            let ecc_bytes = max_payload_bytes(capacity, steganography_engine.parameters(), true)?;
            println!(
                "{:<4} capacity {} bits, max payload {} bytes ({} with ECC)",
                method, capacity, plain_bytes, ecc_bytes
            );
        }
        Ok(())
    }

    /// Handles the compare command
    fn handle_compare_command(
        &mut self,
        input_path: &Path,
        text_data: &str,
        passphrase: Option<&str>,
        out_dir: Option<&Path>,
    ) -> Result<()> {
        let cover_image = load_rgb_image(input_path)?;
        let steganography_engine = SteganographyEngine::new();
        let comparison =
            steganography_engine.compare(&cover_image, text_data.as_bytes(), &Method::ALL, passphrase);

        if let Some(out_dir) = out_dir {
            fs::create_dir_all(out_dir)
                .with_context(|| format!("failed to create {}", out_dir.display()))?;
        }

        for (method, result) in &comparison {
            match result {
                Ok(method_comparison) => {
                    println!(
                        "{:<4} PSNR {:.2} dB, MSE {:.4}",
                        method, method_comparison.psnr, method_comparison.mse
                    );
                    if let Some(out_dir) = out_dir {
                        let stego_path = out_dir.join(format!("stego_{}.png", method));
                        save_rgb_image(&method_comparison.stego_image, &stego_path)?;
                    }
                }
                Err(error) => println!("{:<4} failed: {}", method, error),
            }
        }
        Ok(())
    }

    /// Handles the attack command
    fn handle_attack_command(
        &mut self,
        input_path: &Path,
        output_path: &Path,
        jpeg_quality: Option<u8>,
        flip_bits: Option<usize>,
        seed: u64,
    ) -> Result<()> {
        let steganographic_image = load_rgb_image(input_path)?;

        let damaged_image = match (jpeg_quality, flip_bits) {
            (Some(jpeg_quality), None) => {
                if !(1..=100).contains(&jpeg_quality) {
                    bail!("JPEG quality must be between 1 and 100");
                }
                println!("Recompressing as JPEG (quality {})", jpeg_quality);
                recompress_as_jpeg(&steganographic_image, jpeg_quality)?
            }
            (None, Some(flip_count)) => {
                println!("Flipping {} LSBs (seed {})", flip_count, seed);
                flip_random_lsbs(&steganographic_image, flip_count, seed)?
            }
            _ => bail!("choose exactly one of --jpeg-quality or --flip-bits"),
        };

        let output_file_path = output_file_path(output_path);
        save_rgb_image(&damaged_image, &output_file_path)?;
        println!("Damaged image saved to: {}", output_file_path.display());
        Ok(())
    }

    /// Handles the demo command to create a demonstration
    fn handle_demo_command(&mut self, out_dir: &Path) -> Result<()> {
        println!("Creating demonstration...");
        fs::create_dir_all(out_dir)
            .with_context(|| format!("failed to create {}", out_dir.display()))?;

        let test_image = create_demonstration_image();
        let cover_path = out_dir.join("demo_cover.png");
        save_rgb_image(&test_image, &cover_path)?;

        let mut random_generator = StdRng::from_entropy();
        let mut demo_payload = b"Secret message hidden with multisteg! ".to_vec();
        demo_payload.extend((0..8).map(|_| random_generator.gen_range(b'a'..=b'z')));
        let demo_passphrase = "demo passphrase";

        let steganography_engine = SteganographyEngine::new();
        println!("\n=== DEMONSTRATION RESULTS ===");
        println!("Original message: \"{}\"", String::from_utf8_lossy(&demo_payload));

        for method in Method::ALL {
            let steganographic_image = steganography_engine.encode(
                &test_image,
                &demo_payload,
                method,
                Some(demo_passphrase),
                true,
            )?;
            let recovered_payload =
                steganography_engine.decode(&steganographic_image, method, Some(demo_passphrase), true)?;
            let stego_path = out_dir.join(format!("demo_{}.png", method));
            save_rgb_image(&steganographic_image, &stego_path)?;

            println!(
                "{:<4} PSNR {:.2} dB, success: {}, saved {}",
                method,
                psnr(&test_image, &steganographic_image)?,
                recovered_payload == demo_payload,
                stego_path.display()
            );
        }

        println!("\n=== MANUAL TEST COMMANDS ===");
        println!(
            "multisteg extract -i {} -m dwt -p \"{}\" --ecc",
            out_dir.join("demo_dwt.png").display(),
            demo_passphrase
        );
        Ok(())
    }
}

fn load_rgb_image(input_path: &Path) -> Result<RgbImage> {
    let rgb_image = ImageReader::open(input_path)
        .with_context(|| format!("failed to open {}", input_path.display()))?
        .decode()
        .with_context(|| format!("failed to decode {}", input_path.display()))?
        .to_rgb8();
    tracing::debug!(
        path = %input_path.display(),
        width = rgb_image.width(),
        height = rgb_image.height(),
        "loaded image"
    );
    Ok(rgb_image)
}

fn save_rgb_image(rgb_image: &RgbImage, output_path: &Path) -> Result<()> {
    rgb_image
        .save(output_path)
        .with_context(|| format!("failed to save {}", output_path.display()))
}

/// Appends `.png` when the output path has no extension
fn output_file_path(output_path: &Path) -> PathBuf {
    match output_path.extension() {
        Some(extension) => {
            let extension = extension.to_string_lossy().to_ascii_lowercase();
            if extension == "jpg" || extension == "jpeg" {
                tracing::warn!("lossy output may destroy the embedded payload");
            }
            output_path.to_path_buf()
        }
        None => output_path.with_extension("png"),
    }
}

/// Encodes with `jpeg-encoder` and decodes the result back to RGB
fn recompress_as_jpeg(rgb_image: &RgbImage, jpeg_quality: u8) -> Result<RgbImage> {
    let width = u16::try_from(rgb_image.width()).context("image too wide for JPEG")?;
    let height = u16::try_from(rgb_image.height()).context("image too tall for JPEG")?;

    let mut jpeg_buffer = Vec::new();
    let jpeg_encoder = Encoder::new(&mut jpeg_buffer, jpeg_quality);
    jpeg_encoder
        .encode(rgb_image.as_raw(), width, height, ColorType::Rgb)
        .context("JPEG encoding failed")?;

    Ok(image::load_from_memory(&jpeg_buffer)
        .context("failed to decode recompressed JPEG")?
        .to_rgb8())
}

/// Creates a colorful test image for demonstration
fn create_demonstration_image() -> RgbImage {
    const IMAGE_WIDTH: u32 = 256;
    const IMAGE_HEIGHT: u32 = 256;

    ImageBuffer::from_fn(IMAGE_WIDTH, IMAGE_HEIGHT, |x, y| {
        let red_component = (x * 255 / IMAGE_WIDTH) as u8;
        let green_component = (y * 255 / IMAGE_HEIGHT) as u8;
        let blue_component = ((x + y) * 255 / (IMAGE_WIDTH + IMAGE_HEIGHT)) as u8;
        Rgb([red_component, green_component, blue_component])
    })
}
