/// Binds a model to its table.
///
/// ```ignore
/// define_table!("projects" : Project = id);
/// ```
#[macro_export]
macro_rules! define_table {
    ($table:literal : $model:ty = $id:ident) => {
        impl $crate::database::Table for $model {
            fn id(&self) -> &$crate::database::Thing {
                self.$id.as_ref()
            }

            fn table() -> &'static str {
                $table
            }
        }
    };
}

/// Defines a method to query the database using SQL.
///
/// # Syntax
/// ```ignore
/// [Base Type] > method_name(...arguments) > [Output Type] where "sql query"
/// ```
/// Where the `Base Type` is the type that the method is being defined for and the `Output Type` is the type that the
/// first statement of the query is deserialized into. Every argument is bound under its own name.
///
/// # Example
///
/// ```ignore
/// define_relation! {
///     Feedback > by_user(user_id: &str) > Vec<Feedback>
///         where "SELECT * FROM feedback WHERE user_id = $user_id"
/// }
///
/// let entries = Feedback::by_user("alice", &db).await?;
/// ```
#[macro_export]
macro_rules! define_relation {
    ($model:ty > $relation:ident ($($binding:ident : $binding_type:ty),*) > $export:ty where $query:literal) => {
        impl $model {
            #[tracing::instrument(skip(db))]
            pub async fn $relation(
                $($binding : $binding_type ,)* db: &$crate::database::Database,
            ) -> Result<$export, $crate::database::DatabaseQueryError> {
                db.sql($query)
                    $(.bind((stringify!($binding), $binding)))*
                    .fetch_first()
                    .await
            }
        }
    };
}
