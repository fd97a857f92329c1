//! SeaORM entity models

mod annotation;
mod tweet;
mod user;

pub use tweet::{
    ActiveModel as TweetActiveModel, Column as TweetColumn, Entity as TweetEntity, Model as Tweet,
};

pub use annotation::{
    ActiveModel as AnnotationActiveModel, Column as AnnotationColumn, Entity as AnnotationEntity,
    Model as Annotation,
};

pub use user::{
    ActiveModel as UserActiveModel, Column as UserColumn, Entity as UserEntity, Model as User,
};
