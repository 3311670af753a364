// Copyright (C) Microsoft Corporation. All rights reserved.

use std::io::Write;

use azcipher::CipherAlgorithm;
use azcipher::OsslEngine;
use clap::Parser;

use crate::Command;

/// Print the properties of a cipher algorithm.
#[derive(Parser, Debug)]
pub struct Info {
    /// Algorithm name, e.g. AES-256-CBC or ChaCha20
    pub algorithm: String,

    /// Resolve the algorithm from this provider only
    #[arg(long)]
    pub provider: Option<String>,
}

impl Info {
    fn resolve(&self) -> anyhow::Result<CipherAlgorithm> {
        Ok(match &self.provider {
            Some(provider) => OsslEngine::load(provider)?.algorithm(&self.algorithm)?,
            None => CipherAlgorithm::from_name(&self.algorithm)?,
        })
    }
}

pub(crate) fn describe(out: &mut impl Write, algorithm: &CipherAlgorithm) -> std::io::Result<()> {
    writeln!(out, "name:                {}", algorithm.name())?;
    writeln!(out, "nid:                 {}", algorithm.nid())?;
    writeln!(out, "key length:          {}", algorithm.key_length())?;
    writeln!(out, "iv length:           {}", algorithm.iv_length())?;
    writeln!(out, "block size:          {}", algorithm.block_size())?;
    writeln!(out, "variable key length: {}", algorithm.variable_key_length())?;
    writeln!(out, "aead:                {}", algorithm.is_aead())?;
    writeln!(out, "key wrap:            {}", algorithm.is_wrap())
}

impl Command for Info {
    fn run(self) -> anyhow::Result<()> {
        let algorithm = self.resolve()?;
        tracing::debug!(%algorithm, "resolved");
        describe(&mut std::io::stdout().lock(), &algorithm)?;
        Ok(())
    }
}
