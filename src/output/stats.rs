//! Statistics generation from report files
//!
//! This module provides functionality for summarizing a written report and
//! displaying the summary for the `stats` command.

use crate::model::{NoteKind, Record};
use crate::storage::{ReportMeta, ReportStore, StorageResult};
use std::collections::HashMap;

/// Number of authors listed in the summary
const TOP_AUTHORS: usize = 5;

/// Report statistics summary
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReportStatistics {
    /// Report metadata, if the file carries it
    pub meta: Option<ReportMeta>,

    /// Total number of notes
    pub total_notes: usize,

    pub video_notes: usize,
    pub album_notes: usize,

    pub total_likes: u64,
    pub total_collects: u64,
    pub total_comments: u64,
    pub total_shares: u64,

    /// Authors with the most notes, as (nickname, note count), most first
    pub top_authors: Vec<(String, usize)>,

    /// Note with the highest interaction total, as (note id, interactions)
    pub most_engaged: Option<(String, u64)>,
}

impl ReportStatistics {
    /// Summarizes a batch of records
    pub fn from_records(meta: Option<ReportMeta>, records: &[Record]) -> Self {
        let mut stats = Self {
            meta,
            total_notes: records.len(),
            ..Self::default()
        };

        let mut by_author: HashMap<&str, usize> = HashMap::new();
        for record in records {
            match record.note_type {
                NoteKind::Video => stats.video_notes += 1,
                NoteKind::Album => stats.album_notes += 1,
            }
            stats.total_likes += record.liked_count;
            stats.total_collects += record.collected_count;
            stats.total_comments += record.comment_count;
            stats.total_shares += record.share_count;

            let author = if record.nickname.is_empty() {
                record.user_id.as_str()
            } else {
                record.nickname.as_str()
            };
            *by_author.entry(author).or_insert(0) += 1;

            let interactions = record.interactions();
            if stats
                .most_engaged
                .as_ref()
                .map_or(true, |(_, best)| interactions > *best)
            {
                stats.most_engaged = Some((record.note_id.clone(), interactions));
            }
        }

        let mut authors: Vec<(String, usize)> = by_author
            .into_iter()
            .map(|(name, count)| (name.to_string(), count))
            .collect();
        authors.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        authors.truncate(TOP_AUTHORS);
        stats.top_authors = authors;

        stats
    }
}

/// Loads statistics from a report store
///
/// # Arguments
///
/// * `store` - The report store to read
///
/// # Returns
///
/// * `Ok(ReportStatistics)` - Successfully computed statistics
/// * `Err(StorageError)` - Failed to read the report
pub fn load_statistics(store: &dyn ReportStore) -> StorageResult<ReportStatistics> {
    let meta = store.meta()?;
    let records = store.load_records()?;
    Ok(ReportStatistics::from_records(meta, &records))
}

/// Prints statistics to stdout in a formatted manner
///
/// # Arguments
///
/// * `stats` - The statistics to display
pub fn print_statistics(stats: &ReportStatistics) {
    println!("=== Report Statistics ===\n");

    if let Some(meta) = &stats.meta {
        println!("Report: {}", meta.name);
        println!("Written at: {}", meta.written_at);
        println!();
    }

    println!("Notes:");
    println!("  Total: {}", stats.total_notes);
    println!("  Video: {}", stats.video_notes);
    println!("  Album: {}", stats.album_notes);
    println!();

    println!("Interactions:");
    println!("  Likes: {}", stats.total_likes);
    println!("  Collects: {}", stats.total_collects);
    println!("  Comments: {}", stats.total_comments);
    println!("  Shares: {}", stats.total_shares);
    if let Some((note_id, interactions)) = &stats.most_engaged {
        println!("  Most engaged: {} ({})", note_id, interactions);
    }
    println!();

    if !stats.top_authors.is_empty() {
        println!("Top Authors:");
        for (name, count) in &stats.top_authors {
            println!("  - {}: {}", name, count);
        }
    }
}
