use sea_orm_migration::prelude::*;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20240301_000001_create_contract_templates_table::Migration),
            Box::new(m20240301_000002_create_purchases_table::Migration),
            Box::new(m20240301_000003_create_downloads_table::Migration),
            Box::new(m20240301_000004_create_consultation_requests_table::Migration),
        ]
    }
}

// Migration implementations

mod m20240301_000001_create_contract_templates_table {

    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240301_000001_create_contract_templates_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(ContractTemplates::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(ContractTemplates::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(ColumnDef::new(ContractTemplates::Name).string().not_null())
                        .col(ColumnDef::new(ContractTemplates::Description).string().null())
                        .col(
                            ColumnDef::new(ContractTemplates::Price)
                                .decimal()
                                .not_null()
                                .default(0),
                        )
                        .col(ColumnDef::new(ContractTemplates::Currency).string().not_null())
                        .col(ColumnDef::new(ContractTemplates::StripePriceId).string().null())
                        .col(ColumnDef::new(ContractTemplates::FileUrl).string().null())
                        .col(ColumnDef::new(ContractTemplates::PreviewUrl).string().null())
                        .col(
                            ColumnDef::new(ContractTemplates::IsActive)
                                .boolean()
                                .not_null()
                                .default(true),
                        )
                        .col(
                            ColumnDef::new(ContractTemplates::DisplayOrder)
                                .integer()
                                .not_null()
                                .default(0),
                        )
                        .col(
                            ColumnDef::new(ContractTemplates::CreatedAt)
                                .timestamp()
                                .not_null(),
                        )
                        .col(ColumnDef::new(ContractTemplates::UpdatedAt).timestamp().null())
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_contract_templates_active_order")
                        .table(ContractTemplates::Table)
                        .col(ContractTemplates::IsActive)
                        .col(ContractTemplates::DisplayOrder)
                        .to_owned(),
                )
                .await?;

            Ok(())
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(ContractTemplates::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    enum ContractTemplates {
        Table,
        Id,
        Name,
        Description,
        Price,
        Currency,
        StripePriceId,
        FileUrl,
        PreviewUrl,
        IsActive,
        DisplayOrder,
        CreatedAt,
        UpdatedAt,
    }
}

mod m20240301_000002_create_purchases_table {

    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240301_000002_create_purchases_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Purchases::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(Purchases::Id).uuid().primary_key().not_null())
                        .col(ColumnDef::new(Purchases::TemplateId).uuid().null())
                        .col(ColumnDef::new(Purchases::BuyerName).string().not_null())
                        .col(ColumnDef::new(Purchases::BuyerEmail).string().not_null())
                        .col(ColumnDef::new(Purchases::BuyerPhone).string().null())
                        .col(
                            ColumnDef::new(Purchases::Amount)
                                .decimal()
                                .not_null()
                                .default(0),
                        )
                        .col(ColumnDef::new(Purchases::Currency).string().not_null())
                        .col(ColumnDef::new(Purchases::Kind).string().not_null())
                        .col(ColumnDef::new(Purchases::Status).string().not_null())
                        .col(
                            ColumnDef::new(Purchases::StripeSessionId)
                                .string()
                                .not_null(),
                        )
                        .col(ColumnDef::new(Purchases::CreatedAt).timestamp().not_null())
                        .col(ColumnDef::new(Purchases::UpdatedAt).timestamp().null())
                        .to_owned(),
                )
                .await?;

            // The serialization point for idempotent recording: one purchase
            // per checkout session.
            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("uq_purchases_stripe_session_id")
                        .table(Purchases::Table)
                        .col(Purchases::StripeSessionId)
                        .unique()
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_purchases_template_id")
                        .table(Purchases::Table)
                        .col(Purchases::TemplateId)
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_purchases_status")
                        .table(Purchases::Table)
                        .col(Purchases::Status)
                        .to_owned(),
                )
                .await?;

            Ok(())
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(Purchases::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    enum Purchases {
        Table,
        Id,
        TemplateId,
        BuyerName,
        BuyerEmail,
        BuyerPhone,
        Amount,
        Currency,
        Kind,
        Status,
        StripeSessionId,
        CreatedAt,
        UpdatedAt,
    }
}

mod m20240301_000003_create_downloads_table {

    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240301_000003_create_downloads_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Downloads::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(Downloads::Id).uuid().primary_key().not_null())
                        .col(
                            ColumnDef::new(Downloads::StripeSessionId)
                                .string()
                                .not_null(),
                        )
                        .col(ColumnDef::new(Downloads::TemplateId).uuid().not_null())
                        .col(ColumnDef::new(Downloads::FileUrl).string().not_null())
                        .col(ColumnDef::new(Downloads::IssuedAt).timestamp().not_null())
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("uq_downloads_stripe_session_id")
                        .table(Downloads::Table)
                        .col(Downloads::StripeSessionId)
                        .unique()
                        .to_owned(),
                )
                .await?;

            Ok(())
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(Downloads::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    enum Downloads {
        Table,
        Id,
        StripeSessionId,
        TemplateId,
        FileUrl,
        IssuedAt,
    }
}

mod m20240301_000004_create_consultation_requests_table {

    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240301_000004_create_consultation_requests_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(ConsultationRequests::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(ConsultationRequests::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(ColumnDef::new(ConsultationRequests::Name).string().not_null())
                        .col(ColumnDef::new(ConsultationRequests::Email).string().not_null())
                        .col(ColumnDef::new(ConsultationRequests::Phone).string().null())
                        .col(ColumnDef::new(ConsultationRequests::Topic).string().not_null())
                        .col(
                            ColumnDef::new(ConsultationRequests::Message)
                                .string()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(ConsultationRequests::Status)
                                .string()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(ConsultationRequests::CreatedAt)
                                .timestamp()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(ConsultationRequests::UpdatedAt)
                                .timestamp()
                                .null(),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_consultation_requests_status")
                        .table(ConsultationRequests::Table)
                        .col(ConsultationRequests::Status)
                        .to_owned(),
                )
                .await?;

            Ok(())
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(ConsultationRequests::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    enum ConsultationRequests {
        Table,
        Id,
        Name,
        Email,
        Phone,
        Topic,
        Message,
        Status,
        CreatedAt,
        UpdatedAt,
    }
}
