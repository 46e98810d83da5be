//! SQLite ledger store integration tests.

#[cfg(test)]
mod tests {
    use chrono::{Duration, Utc};
    use orders_types::{
        BizType, DomainError, LedgerStore, ListingId, Money, NewContactReveal, NewVoucherEntry,
        Order, OrderItem, OrderRef, OrderStatus, PaymentReceipt, ProductType, RepoError, UserId,
        format_order_no,
    };

    use crate::SqliteRepo;

    async fn setup_repo() -> SqliteRepo {
        SqliteRepo::new("sqlite::memory:").await.unwrap()
    }

    fn pending_order(user_id: UserId, no: &str, cents: i64) -> Order {
        Order::pending(no.to_string(), user_id, Money::from_cents(cents), Utc::now())
    }

    #[tokio::test]
    async fn test_insert_and_get_order_by_id_and_number() {
        let repo = setup_repo().await;
        let user = repo.insert_user("alice", 0).await.unwrap();
        let listing = repo.insert_listing(user.id, "Cook wanted").await.unwrap();

        let order = pending_order(user.id, "TOP20240309080501000001", 500);
        let item = OrderItem::top(order.id, listing.id, 72, Money::from_cents(500), order.created_at);

        let mut tx = repo.begin().await.unwrap();
        tx.insert_order(&order).await.unwrap();
        tx.insert_order_item(&item).await.unwrap();
        tx.commit().await.unwrap();

        let by_id = repo.get_order(&OrderRef::Id(order.id)).await.unwrap().unwrap();
        assert_eq!(by_id.order_no, order.order_no);
        assert_eq!(by_id.status, OrderStatus::Pending);
        assert_eq!(by_id.amount_total.as_str(), "5.00");
        assert_eq!(by_id.amount_paid.as_str(), "0.00");

        let by_no = repo
            .get_order(&OrderRef::No(order.order_no.clone()))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(by_no.id, order.id);

        let items = repo.list_order_items(order.id).await.unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].product_type, ProductType::Top);
        assert_eq!(items[0].target_id, Some(listing.id));
        assert_eq!(items[0].top_hour, Some(72));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_racing_payers_on_file_database_settle_once() {
        let path = std::env::temp_dir().join(format!("orders-race-{}.db", uuid::Uuid::new_v4()));
        let url = format!("sqlite://{}", path.display());
        let repo = std::sync::Arc::new(SqliteRepo::new(&url).await.unwrap());

        let user = repo.insert_user("alice", 0).await.unwrap();
        let order = pending_order(user.id, "CV-RACE", 990);
        let mut tx = repo.begin().await.unwrap();
        tx.insert_order(&order).await.unwrap();
        tx.commit().await.unwrap();

        let mut handles = Vec::new();
        for n in 0..8 {
            let repo = repo.clone();
            let mut paid = order.clone();
            handles.push(tokio::spawn(async move {
                paid.mark_paid(PaymentReceipt {
                    pay_channel: "wxpay".into(),
                    pay_trade_no: format!("T-{}", n),
                    paid_at: Utc::now(),
                });

                let mut tx = repo.begin().await?;
                let locked = tx.lock_order(paid.id).await?.ok_or(RepoError::NotFound)?;
                if !locked.is_pending() || !tx.mark_order_paid(&paid).await? {
                    return Ok::<bool, RepoError>(false);
                }
                tx.adjust_voucher_balance(paid.user_id, 5, Utc::now()).await?;
                tx.commit().await?;
                Ok(true)
            }));
        }

        let mut winners = 0;
        for handle in handles {
            if handle.await.unwrap().unwrap() {
                winners += 1;
            }
        }

        assert_eq!(winners, 1);
        let fetched = repo.get_user(user.id).await.unwrap().unwrap();
        assert_eq!(fetched.contact_voucher_num, 5);
        let stored = repo.get_order(&OrderRef::Id(order.id)).await.unwrap().unwrap();
        assert_eq!(stored.status, OrderStatus::Paid);

        drop(repo);
        for suffix in ["", "-wal", "-shm"] {
            let _ = std::fs::remove_file(format!("{}{}", path.display(), suffix));
        }
    }

    #[tokio::test]
    async fn test_get_order_not_found() {
        let repo = setup_repo().await;

        let result = repo.get_order(&OrderRef::No("RF0".into())).await.unwrap();

        assert!(result.is_none());
    }

    #[tokio::test]
    async fn test_duplicate_order_no_is_conflict() {
        let repo = setup_repo().await;
        let user = repo.insert_user("alice", 0).await.unwrap();
        let at = Utc::now();
        let no = format_order_no("CV", at, None);

        let mut tx = repo.begin().await.unwrap();
        tx.insert_order(&pending_order(user.id, &no, 990)).await.unwrap();
        let err = tx
            .insert_order(&pending_order(user.id, &no, 990))
            .await
            .unwrap_err();

        assert!(matches!(err, RepoError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_dropped_tx_rolls_back() {
        let repo = setup_repo().await;
        let user = repo.insert_user("alice", 0).await.unwrap();
        let order = pending_order(user.id, "CV1", 990);

        {
            let mut tx = repo.begin().await.unwrap();
            tx.insert_order(&order).await.unwrap();
            tx.adjust_voucher_balance(user.id, 5, Utc::now()).await.unwrap();
        }

        assert!(repo.get_order(&OrderRef::Id(order.id)).await.unwrap().is_none());
        let fetched = repo.get_user(user.id).await.unwrap().unwrap();
        assert_eq!(fetched.contact_voucher_num, 0);
    }

    #[tokio::test]
    async fn test_mark_order_paid_only_once() {
        let repo = setup_repo().await;
        let user = repo.insert_user("alice", 0).await.unwrap();
        let mut order = pending_order(user.id, "CV2", 990);

        let mut tx = repo.begin().await.unwrap();
        tx.insert_order(&order).await.unwrap();
        tx.commit().await.unwrap();

        order.mark_paid(PaymentReceipt {
            pay_channel: "wxpay".into(),
            pay_trade_no: "T-1".into(),
            paid_at: Utc::now(),
        });

        let mut tx = repo.begin().await.unwrap();
        let locked = tx.lock_order(order.id).await.unwrap().unwrap();
        assert!(locked.is_pending());
        assert!(tx.mark_order_paid(&order).await.unwrap());
        assert!(!tx.mark_order_paid(&order).await.unwrap());
        tx.commit().await.unwrap();

        let stored = repo.get_order(&OrderRef::Id(order.id)).await.unwrap().unwrap();
        assert_eq!(stored.status, OrderStatus::Paid);
        assert_eq!(stored.amount_paid.as_str(), "9.90");
        assert_eq!(stored.pay_trade_no.as_deref(), Some("T-1"));
        assert!(stored.paid_at.is_some());
    }

    #[tokio::test]
    async fn test_adjust_voucher_balance_reports_before_and_after() {
        let repo = setup_repo().await;
        let user = repo.insert_user("alice", 3).await.unwrap();

        let mut tx = repo.begin().await.unwrap();
        let change = tx.adjust_voucher_balance(user.id, 5, Utc::now()).await.unwrap();
        assert_eq!(change.last_num, 3);
        assert_eq!(change.next_num, 8);

        let change = tx.adjust_voucher_balance(user.id, -8, Utc::now()).await.unwrap();
        assert_eq!(change.last_num, 8);
        assert_eq!(change.next_num, 0);
        tx.commit().await.unwrap();

        let fetched = repo.get_user(user.id).await.unwrap().unwrap();
        assert_eq!(fetched.contact_voucher_num, 0);
    }

    #[tokio::test]
    async fn test_adjust_voucher_balance_refuses_negative() {
        let repo = setup_repo().await;
        let user = repo.insert_user("alice", 2).await.unwrap();

        let mut tx = repo.begin().await.unwrap();
        let err = tx
            .adjust_voucher_balance(user.id, -3, Utc::now())
            .await
            .unwrap_err();
        drop(tx);

        assert!(matches!(
            err,
            RepoError::Domain(DomainError::InsufficientVoucher {
                available: 2,
                requested: 3
            })
        ));
        let fetched = repo.get_user(user.id).await.unwrap().unwrap();
        assert_eq!(fetched.contact_voucher_num, 2);
    }

    #[tokio::test]
    async fn test_adjust_voucher_balance_unknown_user() {
        let repo = setup_repo().await;

        let mut tx = repo.begin().await.unwrap();
        let err = tx
            .adjust_voucher_balance(UserId::new(404), 1, Utc::now())
            .await
            .unwrap_err();

        assert!(matches!(err, RepoError::NotFound));
    }

    #[tokio::test]
    async fn test_listing_schedule_roundtrip() {
        let repo = setup_repo().await;
        let user = repo.insert_user("alice", 0).await.unwrap();
        let listing = repo.insert_listing(user.id, "Driver").await.unwrap();
        let now = Utc::now();

        let mut tx = repo.begin().await.unwrap();
        let mut locked = tx.lock_listing(listing.id).await.unwrap().unwrap();
        locked.extend_top_window(now, 3).unwrap();
        locked.refresh(now);
        tx.save_listing_schedule(&locked).await.unwrap();
        tx.commit().await.unwrap();

        let stored = repo.get_listing(listing.id).await.unwrap().unwrap();
        assert_eq!(stored.top_start_time, Some(now));
        assert_eq!(stored.top_end_time, Some(now + Duration::hours(3)));
        assert_eq!(stored.refresh_time, Some(now));
    }

    #[tokio::test]
    async fn test_save_schedule_of_missing_listing() {
        let repo = setup_repo().await;
        let user = repo.insert_user("alice", 0).await.unwrap();
        let mut listing = repo.insert_listing(user.id, "Driver").await.unwrap();
        listing.id = ListingId::new(999);

        let mut tx = repo.begin().await.unwrap();
        assert!(tx.lock_listing(listing.id).await.unwrap().is_none());
        let err = tx.save_listing_schedule(&listing).await.unwrap_err();

        assert!(matches!(err, RepoError::NotFound));
    }

    #[tokio::test]
    async fn test_voucher_entries_newest_first() {
        let repo = setup_repo().await;
        let user = repo.insert_user("alice", 0).await.unwrap();

        let mut tx = repo.begin().await.unwrap();
        for delta in [5, -1, -2] {
            let biz_type = if delta > 0 { BizType::Buy } else { BizType::Cost };
            let change = tx.adjust_voucher_balance(user.id, delta, Utc::now()).await.unwrap();
            tx.append_voucher_entry(&NewVoucherEntry::for_change(
                user.id,
                biz_type,
                change,
                "test",
                Utc::now(),
            ))
            .await
            .unwrap();
        }
        tx.commit().await.unwrap();

        assert_eq!(repo.count_voucher_entries(user.id).await.unwrap(), 3);

        let page = repo.list_voucher_entries(user.id, 2, 0).await.unwrap();
        assert_eq!(page.len(), 2);
        assert_eq!(page[0].change_num, -2);
        assert_eq!(page[0].next_num, 2);
        assert_eq!(page[1].change_num, -1);
        assert_eq!(page[1].next_num, page[0].last_num);

        let rest = repo.list_voucher_entries(user.id, 2, 2).await.unwrap();
        assert_eq!(rest.len(), 1);
        assert_eq!(rest[0].biz_type, BizType::Buy);
        assert_eq!(rest[0].last_num, 0);
    }

    #[tokio::test]
    async fn test_contact_reveal_append_and_list() {
        let repo = setup_repo().await;
        let user = repo.insert_user("alice", 1).await.unwrap();
        let reveal = NewContactReveal {
            purpose_id: 42,
            purpose_type: 1,
            purpose_user_id: Some(UserId::new(7)),
            purpose_user_phone: Some("13800000000".into()),
        };

        let mut tx = repo.begin().await.unwrap();
        let stored = tx.append_contact_reveal(user.id, &reveal, Utc::now()).await.unwrap();
        tx.commit().await.unwrap();

        let listed = repo.list_contact_reveals(user.id, 10, 0).await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].id, stored.id);
        assert_eq!(listed[0].purpose_id, 42);
        assert_eq!(listed[0].purpose_user_id, Some(UserId::new(7)));
    }

    #[tokio::test]
    async fn test_backfill_voucher_counts_from_titles() {
        let repo = setup_repo().await;
        let user = repo.insert_user("alice", 0).await.unwrap();
        let at = Utc::now();

        let legacy_cn = pending_order(user.id, "CV10", 990);
        let legacy_en = pending_order(user.id, "CV11", 990);
        let broken = pending_order(user.id, "CV12", 990);

        let mut cn_item = OrderItem::contact_voucher(legacy_cn.id, 10, Money::from_cents(990), at);
        cn_item.title_snapshot = "联系券-10张".into();
        cn_item.contact_voucher_num = None;
        let mut en_item = OrderItem::contact_voucher(legacy_en.id, 3, Money::from_cents(990), at);
        en_item.contact_voucher_num = Some(0);
        let mut broken_item = OrderItem::contact_voucher(broken.id, 1, Money::from_cents(990), at);
        broken_item.title_snapshot = "bundle".into();
        broken_item.contact_voucher_num = None;

        let mut tx = repo.begin().await.unwrap();
        for (order, item) in [(&legacy_cn, &cn_item), (&legacy_en, &en_item), (&broken, &broken_item)] {
            tx.insert_order(order).await.unwrap();
            tx.insert_order_item(item).await.unwrap();
        }
        tx.commit().await.unwrap();

        let report = repo.backfill_voucher_counts().await.unwrap();
        assert_eq!(report.updated, 2);
        assert_eq!(report.unparseable, 1);

        let items = repo.list_order_items(legacy_cn.id).await.unwrap();
        assert_eq!(items[0].contact_voucher_num, Some(10));
        let items = repo.list_order_items(legacy_en.id).await.unwrap();
        assert_eq!(items[0].contact_voucher_num, Some(3));

        // A second run finds only the unparseable row.
        let report = repo.backfill_voucher_counts().await.unwrap();
        assert_eq!(report.updated, 0);
        assert_eq!(report.unparseable, 1);
    }
}
