use crate::{
    cli::{actions::Action, globals::GlobalArgs, progressbar::Bar},
    coordinator::Coordinator,
    upload::{
        Event, FileSource, State, UploadSession, UploadSpec, planner::part_count,
        source::ByteSource,
    },
};
use anyhow::{Context, Result, anyhow};
use bytesize::ByteSize;
use colored::Colorize;
use std::sync::Arc;

/// # Errors
/// Will return an error if the upload fails or is aborted
pub async fn handle(coordinator: Coordinator, action: Action, globals: GlobalArgs) -> Result<()> {
    let Action::Upload {
        file,
        name,
        chunk_size,
        concurrency,
        quiet,
    } = action;

    let source = FileSource::open(&file).await.with_context(|| {
        format!(
            "cannot read the file: {}, verify file exist and is not a directory.",
            file.display()
        )
    })?;

    let file_size = source.len();
    let parts = part_count(file_size, chunk_size);

    log::info!(
        "file path: {}\nfile size: {}\npart size: {}",
        file.display(),
        ByteSize(file_size),
        ByteSize(chunk_size)
    );

    let spec = UploadSpec::new(source, name)
        .with_chunk_size(chunk_size)
        .with_max_concurrency(concurrency)
        .with_session_token(globals.session_token)
        .with_retries(globals.retries);

    let mut session = UploadSession::new(Arc::new(coordinator), spec);
    let mut events = session.events().context("event receiver already taken")?;

    let pb = Bar::new(file_size, Some(quiet));

    let handle = session.start();

    loop {
        tokio::select! {
            event = events.recv() => match event {
                Some(Event::Progress(snapshot)) => pb.update(snapshot.sent, snapshot.percentage),
                Some(Event::Failed(_) | Event::Completed | Event::Aborted) | None => break,
            },

            _ = tokio::signal::ctrl_c() => {
                handle.abort();
            }
        }
    }

    let report = handle.wait().await?;

    match report.state {
        State::Completed => {
            pb.finish();

            if !report.finalized {
                eprintln!(
                    "{}",
                    "all parts were uploaded but the upload could not be finalized, use -v for details"
                        .yellow()
                );
            }

            if let Some(session) = report.session {
                println!("{}", session.file_key);
            }

            Ok(())
        }

        State::Aborted => {
            pb.abandon();

            Err(anyhow!(
                "upload aborted, {} of {parts} parts uploaded",
                report.uploaded.len()
            ))
        }

        _ => {
            pb.abandon();

            Err(report.error.map_or_else(
                || anyhow!("upload finished in state: {}", report.state),
                anyhow::Error::from,
            ))
        }
    }
}
