use crate::models::{BlogPage, BlogPost, BlogSummary, Guest, GuestSummary, SimilarBlogs};
use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    paths(
        crate::routes::list_blogs,
        crate::routes::create_blog,
        crate::routes::get_blog,
        crate::routes::similar_blogs,
        crate::routes::update_blog,
        crate::routes::delete_blog,
        crate::routes::list_guests,
        crate::routes::create_guest,
        crate::routes::get_guest,
        crate::routes::update_guest,
        crate::routes::delete_guest,
    ),
    components(schemas(BlogPost, BlogSummary, BlogPage, SimilarBlogs, Guest, GuestSummary)),
    tags(
        (name = "blogs", description = "Blog posts and their media"),
        (name = "guests", description = "Podcast guest profiles"),
    )
)]
pub struct ApiDoc;
