//! Row mapping protocol
//!
//! Listing handlers turn storage rows into response shapes through a fold:
//! each row is mapped with read access to the whole fetched window and an
//! accumulator threaded through the calls. Rows are mapped sequentially in
//! result order, so batched lookups can be cached in the accumulator by
//! earlier rows and reused by later ones.

use async_trait::async_trait;

use crate::data::error::DataError;
use crate::data::query::paginate::Paginated;

#[async_trait]
pub trait RowMapper<R: Sync>: Send + Sync {
    type Out: Send;
    type Acc: Default + Send;

    async fn map(
        &self,
        row: &R,
        window: &[R],
        acc: Self::Acc,
    ) -> Result<(Self::Out, Self::Acc), DataError>;
}

/// Map rows in order, threading the accumulator through each call
pub async fn map_rows<R, M>(mapper: &M, rows: &[R]) -> Result<Vec<M::Out>, DataError>
where
    R: Sync,
    M: RowMapper<R>,
{
    let mut out = Vec::with_capacity(rows.len());
    let mut acc = M::Acc::default();
    for row in rows {
        let (mapped, next) = mapper.map(row, rows, acc).await?;
        out.push(mapped);
        acc = next;
    }
    Ok(out)
}

/// Map a paginated result's rows while keeping its shape and metadata
pub async fn map_paginated<R, M>(
    mapper: &M,
    page: Paginated<R>,
) -> Result<Paginated<M::Out>, DataError>
where
    R: Sync + Send,
    M: RowMapper<R>,
{
    Ok(match page {
        Paginated::All { items } => Paginated::All {
            items: map_rows(mapper, &items).await?,
        },
        Paginated::Pages { items, meta } => Paginated::Pages {
            items: map_rows(mapper, &items).await?,
            meta,
        },
        Paginated::Cursors {
            edges,
            cursors,
            total_count,
        } => Paginated::Cursors {
            edges: map_rows(mapper, &edges).await?,
            cursors,
            total_count,
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Numbering;

    #[async_trait]
    impl RowMapper<String> for Numbering {
        type Out = String;
        type Acc = usize;

        async fn map(
            &self,
            row: &String,
            window: &[String],
            acc: usize,
        ) -> Result<(String, usize), DataError> {
            Ok((format!("{}/{} {row}", acc + 1, window.len()), acc + 1))
        }
    }

    #[tokio::test]
    async fn folds_in_order_with_window_access() {
        let rows = vec!["a".to_string(), "b".to_string()];
        let out = map_rows(&Numbering, &rows).await.unwrap();
        assert_eq!(out, vec!["1/2 a", "2/2 b"]);
    }

    #[tokio::test]
    async fn empty_window_maps_to_empty() {
        let out = map_rows(&Numbering, &[]).await.unwrap();
        assert!(out.is_empty());
    }
}
