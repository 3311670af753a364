// Copyright (C) Microsoft Corporation. All rights reserved.

use std::fs::File;
use std::io::BufReader;
use std::io::BufWriter;
use std::io::ErrorKind;
use std::io::Read;
use std::io::Write;
use std::path::PathBuf;

use anyhow::Context;
use azcipher::CipherAlgorithm;
use azcipher::CipherContext;
use azcipher::DefaultNative;
use azcipher::Direction;
use azcipher::OsslEngine;
use clap::Args;
use clap::Parser;

use crate::Command;

/// Options shared by `encrypt` and `decrypt`.
#[derive(Args, Debug)]
pub struct CryptArgs {
    /// Algorithm name, e.g. AES-256-CBC
    #[arg(short, long)]
    pub algorithm: String,

    /// Key as hex
    #[arg(short, long)]
    pub key: String,

    /// IV as hex; required when the algorithm uses one
    #[arg(long)]
    pub iv: Option<String>,

    /// Disable PKCS#7 padding; input must then be block aligned
    #[arg(long)]
    pub no_padding: bool,

    /// Key length in bytes for variable-key-length algorithms
    #[arg(long)]
    pub key_length: Option<usize>,

    /// Provider to take the implementation from (e.g. legacy)
    #[arg(long)]
    pub provider: Option<String>,

    /// Input file [default: stdin]
    #[arg(short, long)]
    pub input: Option<PathBuf>,

    /// Output file [default: stdout]
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Bytes read per update call
    #[arg(long, default_value_t = 64 * 1024, value_parser = clap::value_parser!(u32).range(1..))]
    pub chunk_size: u32,
}

/// Encrypt a stream.
#[derive(Parser, Debug)]
pub struct Encrypt {
    #[command(flatten)]
    pub args: CryptArgs,

    /// Length of the AEAD tag printed to stderr after encryption
    #[arg(long, default_value_t = 16)]
    pub tag_length: usize,
}

/// Decrypt a stream.
#[derive(Parser, Debug)]
pub struct Decrypt {
    #[command(flatten)]
    pub args: CryptArgs,

    /// Expected AEAD tag as hex
    #[arg(long)]
    pub tag: Option<String>,
}

impl CryptArgs {
    /// Builds a context keyed for `direction`.
    fn open(&self, direction: Direction) -> anyhow::Result<CipherContext> {
        let key = hex::decode(&self.key).context("--key is not valid hex")?;
        let iv = self
            .iv
            .as_deref()
            .map(hex::decode)
            .transpose()
            .context("--iv is not valid hex")?;

        let engine = self.provider.as_deref().map(OsslEngine::load).transpose()?;
        let algorithm = match &engine {
            Some(engine) => engine.algorithm(&self.algorithm)?,
            None => CipherAlgorithm::from_name(&self.algorithm)?,
        };

        let mut ctx = CipherContext::<DefaultNative>::new()?;
        match self.key_length {
            Some(len) => {
                // Bind first with a placeholder key; the length can only be
                // changed on a bound context.
                let placeholder_key = vec![0u8; algorithm.key_length()];
                let placeholder_iv = vec![0u8; algorithm.iv_length()];
                ctx.initialize(
                    &algorithm,
                    direction,
                    &placeholder_key,
                    Some(&placeholder_iv),
                    engine.as_ref(),
                )?;
                ctx.set_key_length(len)?;
                ctx.initialize(&algorithm, direction, &key, iv.as_deref(), None)?;
            }
            None => {
                ctx.initialize(&algorithm, direction, &key, iv.as_deref(), engine.as_ref())?
            }
        }

        if self.no_padding {
            ctx.set_padding(false)?;
        }
        tracing::debug!(?ctx, "context ready");
        Ok(ctx)
    }

    fn reader(&self) -> anyhow::Result<Box<dyn Read>> {
        Ok(match &self.input {
            Some(path) => Box::new(BufReader::new(
                File::open(path).with_context(|| format!("opening {}", path.display()))?,
            )),
            None => Box::new(std::io::stdin().lock()),
        })
    }

    fn writer(&self) -> anyhow::Result<Box<dyn Write>> {
        Ok(match &self.output {
            Some(path) => Box::new(BufWriter::new(
                File::create(path).with_context(|| format!("creating {}", path.display()))?,
            )),
            None => Box::new(std::io::stdout().lock()),
        })
    }
}

/// Pumps `reader` through `ctx` into `writer` and finalizes the stream.
///
/// Returns the number of bytes written.
pub(crate) fn stream(
    ctx: &mut CipherContext,
    reader: &mut dyn Read,
    writer: &mut dyn Write,
    chunk_size: usize,
) -> anyhow::Result<u64> {
    let mut input = vec![0u8; chunk_size];
    let mut output = vec![0u8; ctx.update_capacity(chunk_size)?.max(ctx.final_capacity()?)];
    let mut total = 0u64;

    loop {
        let n = match reader.read(&mut input) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(e).context("reading input"),
        };
        let written = ctx.update(&mut output, &input[..n])?;
        writer.write_all(&output[..written])?;
        total += written as u64;
    }

    let written = ctx.finalize(&mut output)?;
    writer.write_all(&output[..written])?;
    writer.flush()?;
    total += written as u64;

    tracing::debug!(total, "stream complete");
    Ok(total)
}

impl Encrypt {
    /// Encrypts `reader` into `writer`; returns the tag for AEAD algorithms.
    pub(crate) fn process(
        &self,
        reader: &mut dyn Read,
        writer: &mut dyn Write,
    ) -> anyhow::Result<Option<Vec<u8>>> {
        let mut ctx = self.args.open(Direction::Encrypt)?;
        stream(&mut ctx, reader, writer, self.args.chunk_size as usize)?;

        if !ctx.algorithm()?.is_aead() {
            return Ok(None);
        }
        let mut tag = vec![0u8; self.tag_length];
        ctx.aead_tag(&mut tag)?;
        Ok(Some(tag))
    }
}

impl Command for Encrypt {
    fn run(self) -> anyhow::Result<()> {
        let mut reader = self.args.reader()?;
        let mut writer = self.args.writer()?;
        if let Some(tag) = self.process(&mut reader, &mut writer)? {
            eprintln!("tag: {}", hex::encode(tag));
        }
        Ok(())
    }
}

impl Decrypt {
    pub(crate) fn process(
        &self,
        reader: &mut dyn Read,
        writer: &mut dyn Write,
    ) -> anyhow::Result<()> {
        let mut ctx = self.args.open(Direction::Decrypt)?;
        if ctx.algorithm()?.is_aead() {
            let tag = self
                .tag
                .as_deref()
                .context("--tag is required for AEAD algorithms")?;
            let tag = hex::decode(tag).context("--tag is not valid hex")?;
            ctx.set_aead_tag(&tag)?;
        }
        stream(&mut ctx, reader, writer, self.args.chunk_size as usize)?;
        Ok(())
    }
}

impl Command for Decrypt {
    fn run(self) -> anyhow::Result<()> {
        let mut reader = self.args.reader()?;
        let mut writer = self.args.writer()?;
        self.process(&mut reader, &mut writer)
    }
}
